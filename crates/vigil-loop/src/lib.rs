// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! vigil_loop - Single-threaded `poll(2)` event loop
//!
//! Descriptors are registered with a callback that receives the caller's
//! context object, the descriptor and the readiness reported by `poll`.
//! One-shot timers run after the descriptors of the same iteration.
//! Signals are turned into readable descriptors with [`SignalPipe`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vigil_loop::{Dispatch, EventLoop, Readiness, SignalPipe};
//!
//! struct Ctx {
//!     running: bool,
//! }
//!
//! fn example() -> Result<(), vigil_loop::LoopError> {
//!     let signals = SignalPipe::install(libc::SIGUSR1)?;
//!     let mut event_loop = EventLoop::new();
//!
//!     event_loop.register(signals.raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, _, _| {
//!         ctx.running = false;
//!         Dispatch::Continue
//!     })?;
//!     event_loop.add_timer(Duration::from_secs(3), |_ctx: &mut Ctx| println!("tick"));
//!
//!     let mut ctx = Ctx { running: true };
//!     while ctx.running {
//!         event_loop.run_once(&mut ctx, None)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

#[cfg(test)]
mod tests;

mod error;
mod event_loop;
mod readiness;
mod signal;

pub use error::LoopError;
pub use event_loop::{Dispatch, EventLoop, TimerId};
pub use readiness::Readiness;
pub use signal::SignalPipe;
