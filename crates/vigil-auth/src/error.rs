// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vigil-auth.
use std::io;

use thiserror::Error;
use vigil_buffer::BufferError;

/// Errors from the authentication channel and the checker.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `fork()` or `socketpair()` failed.
    #[error("unable to spawn password checker: {0}")]
    Spawn(#[source] io::Error),

    /// The checker crashed or closed its end of the channel.
    #[error("password checking subprocess is gone")]
    ChannelBroken,

    /// A verdict byte other than 0 or 1, or a verdict nobody asked for.
    #[error("malformed verdict byte {0:#04x}")]
    MalformedVerdict(u8),

    /// A request was submitted while another one is awaiting its verdict.
    #[error("a password check is already in progress")]
    RequestOutstanding,

    /// A request frame announced more bytes than the protocol allows.
    #[error("request of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced payload length.
        len: usize,
        /// Protocol maximum.
        max: usize,
    },

    /// The peer closed the stream in the middle of a frame.
    #[error("request frame truncated")]
    Truncated,

    /// The invoking user has no passwd or shadow entry.
    #[error("no password entry for uid {0}")]
    UnknownUser(u32),

    /// Secret storage could not be set up.
    #[error("secret buffer: {0}")]
    Buffer(#[from] BufferError),

    /// Any other I/O failure on the channel.
    #[error("channel I/O: {0}")]
    Io(#[from] io::Error),
}
