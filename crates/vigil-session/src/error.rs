// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vigil-session.
use thiserror::Error;

/// Exit status for a compositor that refused or revoked the lock.
pub const EXIT_LOCK_DENIED: i32 = 2;

/// Exit status for every other fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// Fatal session errors. None of them unlocks the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A required global was not advertised.
    #[error("missing {0}")]
    MissingCapability(&'static str),

    /// The compositor sent `finished`.
    #[error("failed to lock session -- is another lockscreen running?")]
    LockDenied,

    /// `unlock` outside of the `Locked` state.
    #[error("session is not locked")]
    NotLocked,

    /// `begin_lock` called twice.
    #[error("lock already requested")]
    AlreadyRequested,

    /// The compositor sent an event that is illegal in the current state.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// The display connection failed.
    #[error("display connection lost: {0}")]
    Disconnected(String),
}

impl SessionError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::LockDenied => EXIT_LOCK_DENIED,
            _ => EXIT_FAILURE,
        }
    }
}
