// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Privilege-separated password verification.
//!
//! The locker forks a checker subprocess before it drops privileges. The
//! two processes share exactly one duplex `AF_UNIX` stream and nothing
//! else; the parent, which also talks to the compositor and handles input,
//! never sees the password hash.
//!
//! # Wire format
//!
//! ```text
//! request:  len: u32 LE | flags: u8 | payload[len]     (len <= MAX_SECRET_LEN)
//! verdict:  0x00 failure | 0x01 success
//! ```
//!
//! At most one request is outstanding. An empty password submitted with
//! `ignore_empty` is failed locally and never reaches the checker.
//!
//! # Example
//!
//! ```rust,no_run
//! use vigil_auth::{AuthChannel, Reply, ShadowChecker, Submission};
//! use vigil_buffer::SecretBuffer;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut channel = AuthChannel::spawn(ShadowChecker::for_current_user)?;
//!
//!     let mut password = SecretBuffer::new()?;
//!     password.append(b"hunter2")?;
//!
//!     if let Submission::Sent = channel.submit(&password, true)? {
//!         password.clear();
//!         // register channel.raw_fd() with the event loop, then on readiness:
//!         if let Reply::Verdict(verdict) = channel.poll_reply()? {
//!             println!("verdict: {:?}", verdict);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

#[cfg(test)]
mod tests;

mod channel;
mod checker;
mod error;
mod shadow;

pub mod wire;

pub use channel::{AuthChannel, ChannelState, Reply, Submission};
pub use checker::{CredentialChecker, serve};
pub use error::AuthError;
pub use shadow::ShadowChecker;
pub use wire::Verdict;
