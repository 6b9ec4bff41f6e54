// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! vigil_session - Session-lock protocol state machine
//!
//! [`LockSession`] consumes [`ServerEvent`]s one at a time and answers
//! through a [`LockBackend`], which owns the actual protocol objects. The
//! state machine never touches the display connection itself, so it runs
//! unchanged against a recording backend in tests.
//!
//! ```text
//! Connecting --begin_lock--> AwaitingLockGrant --locked--> Locked --unlock--> Unlocking --> Destroyed
//!      \                           |                          |
//!       `-------------------- finished ----------------------'--> Denied (exit 2)
//! ```

#![warn(missing_docs)]

#[cfg(test)]
mod tests;

mod backend;
mod error;
mod event;
mod registry;
mod session;

pub use backend::LockBackend;
pub use error::{EXIT_FAILURE, EXIT_LOCK_DENIED, SessionError};
pub use event::{ServerEvent, Subpixel};
pub use registry::{Frame, LockSurface, Output, OutputId, OutputRegistry};
pub use session::{AUTH_IDLE_DELAY, AuthState, Capabilities, Flow, LockSession, LockState};
