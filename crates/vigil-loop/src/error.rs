// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vigil-loop.
use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors from the event loop and the signal pipe.
#[derive(Debug, Error)]
pub enum LoopError {
    /// `poll(2)` failed with something other than `EINTR`.
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The descriptor is negative.
    #[error("invalid file descriptor {0}")]
    InvalidFd(RawFd),

    /// The descriptor already has a callback.
    #[error("file descriptor {0} is already registered")]
    AlreadyRegistered(RawFd),

    /// `pipe2(2)` failed.
    #[error("unable to create signal pipe: {0}")]
    Pipe(#[source] io::Error),

    /// `sigaction(2)` failed.
    #[error("unable to install handler for signal {signal}: {source}")]
    Sigaction {
        /// Signal number.
        signal: i32,
        /// OS error.
        source: io::Error,
    },

    /// A [`SignalPipe`](crate::SignalPipe) is already installed in this
    /// process.
    #[error("a signal pipe is already installed")]
    SignalInUse,
}
