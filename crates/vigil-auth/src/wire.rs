// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Request and verdict framing.

use vigil_buffer::MAX_SECRET_LEN;

use crate::error::AuthError;

/// Size of the request header: `u32` length plus one flag byte.
pub const HEADER_LEN: usize = 5;

/// Largest payload a request may carry.
pub const MAX_PAYLOAD_LEN: usize = MAX_SECRET_LEN;

/// Largest request on the wire.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Request flag: the submitter asked for empty passwords to be ignored.
pub const FLAG_IGNORE_EMPTY: u8 = 0b0000_0001;

const VERDICT_FAILURE: u8 = 0x00;
const VERDICT_SUCCESS: u8 = 0x01;

/// Result of checking one password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The password matched.
    Success,
    /// The password did not match, or was not checked.
    Failure,
}

impl Verdict {
    /// Wire encoding.
    pub fn to_byte(self) -> u8 {
        match self {
            Verdict::Success => VERDICT_SUCCESS,
            Verdict::Failure => VERDICT_FAILURE,
        }
    }

    /// Parses a verdict byte; anything but 0 or 1 is malformed.
    pub fn from_byte(byte: u8) -> Result<Self, AuthError> {
        match byte {
            VERDICT_SUCCESS => Ok(Verdict::Success),
            VERDICT_FAILURE => Ok(Verdict::Failure),
            other => Err(AuthError::MalformedVerdict(other)),
        }
    }

    /// `true` for [`Verdict::Success`].
    pub fn is_success(self) -> bool {
        self == Verdict::Success
    }
}

impl From<bool> for Verdict {
    fn from(success: bool) -> Self {
        if success {
            Verdict::Success
        } else {
            Verdict::Failure
        }
    }
}

/// Decoded request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Payload length in bytes.
    pub len: usize,
    /// `FLAG_*` bits.
    pub flags: u8,
}

impl RequestHeader {
    /// Encodes the header, rejecting payloads over [`MAX_PAYLOAD_LEN`].
    pub fn encode(&self) -> Result<[u8; HEADER_LEN], AuthError> {
        if self.len > MAX_PAYLOAD_LEN {
            return Err(AuthError::FrameTooLarge {
                len: self.len,
                max: MAX_PAYLOAD_LEN,
            });
        }

        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&(self.len as u32).to_le_bytes());
        bytes[4] = self.flags;

        Ok(bytes)
    }

    /// Decodes a header, rejecting lengths over [`MAX_PAYLOAD_LEN`].
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, AuthError> {
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;

        if len > MAX_PAYLOAD_LEN {
            return Err(AuthError::FrameTooLarge {
                len,
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Self {
            len,
            flags: bytes[4],
        })
    }

    /// Whether [`FLAG_IGNORE_EMPTY`] is set.
    pub fn ignore_empty(&self) -> bool {
        self.flags & FLAG_IGNORE_EMPTY != 0
    }
}
