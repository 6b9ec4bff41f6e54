// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::io::{ErrorKind, Read, Write};

use vigil_buffer::SecretBuffer;
use vigil_util::zeroize;

use crate::error::AuthError;
use crate::wire::{HEADER_LEN, MAX_PAYLOAD_LEN, RequestHeader, Verdict};

const CHUNK_LEN: usize = 64;

/// Verifies one candidate password.
pub trait CredentialChecker {
    /// Returns `true` if `secret` is the password.
    fn check(&mut self, secret: &[u8]) -> bool;
}

impl<F> CredentialChecker for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn check(&mut self, secret: &[u8]) -> bool {
        self(secret)
    }
}

/// Checker side of the channel.
///
/// Reads one request at a time, answers with one verdict byte, and
/// returns `Ok(())` when the peer closes the stream between frames.
pub fn serve<S, C>(stream: &mut S, checker: &mut C) -> Result<(), AuthError>
where
    S: Read + Write,
    C: CredentialChecker,
{
    let mut secret = SecretBuffer::with_limit(MAX_PAYLOAD_LEN, MAX_PAYLOAD_LEN)?;

    loop {
        let mut header = [0u8; HEADER_LEN];
        if !read_header(stream, &mut header)? {
            return Ok(());
        }

        let request = RequestHeader::decode(&header)?;

        secret.clear();
        let read = read_payload(stream, request.len, &mut secret);
        let verdict = match read {
            Ok(()) => Verdict::from(checker.check(secret.as_bytes())),
            Err(e) => {
                secret.clear();
                return Err(e);
            }
        };
        secret.clear();

        log::debug!("password check result: {:?}", verdict);

        stream.write_all(&[verdict.to_byte()])?;
        stream.flush()?;
    }
}

// Returns `false` on EOF before the first byte.
fn read_header<S: Read>(stream: &mut S, header: &mut [u8; HEADER_LEN]) -> Result<bool, AuthError> {
    let mut filled = 0;

    while filled < HEADER_LEN {
        match stream.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(AuthError::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(true)
}

fn read_payload<S: Read>(
    stream: &mut S,
    len: usize,
    secret: &mut SecretBuffer,
) -> Result<(), AuthError> {
    let mut scratch = [0u8; CHUNK_LEN];
    let mut remaining = len;

    let result = loop {
        if remaining == 0 {
            break Ok(());
        }

        let n = remaining.min(CHUNK_LEN);
        if let Err(e) = stream.read_exact(&mut scratch[..n]) {
            break Err(match e.kind() {
                ErrorKind::UnexpectedEof => AuthError::Truncated,
                _ => AuthError::Io(e),
            });
        }

        if let Err(e) = secret.append(&scratch[..n]) {
            break Err(e.into());
        }
        remaining -= n;
    };

    zeroize(&mut scratch);

    result
}
