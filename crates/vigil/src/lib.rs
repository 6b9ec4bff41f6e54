// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! vigil - Screen locker for Wayland
//!
//! Startup order matters:
//!
//! 1. the process is hardened against core dumps and ptrace;
//! 2. the password checker is forked while privileges are still held;
//! 3. privileges are dropped;
//! 4. the configuration is loaded and the session is locked.
//!
//! Exit status is 0 after a successful unlock, 2 when the compositor
//! refuses or revokes the lock, and 1 on any other failure.

#![warn(missing_docs)]

#[cfg(test)]
mod tests;

pub mod config;
pub mod daemon;
pub mod daemonize;
pub mod input;
pub mod locker;
pub mod logging;
pub mod render;
pub mod wayland;

use std::ffi::OsString;

use vigil_auth::{AuthChannel, ShadowChecker};
use vigil_session::EXIT_FAILURE;

/// Runs the locker and returns the process exit status.
pub fn run() -> i32 {
    let args: Vec<OsString> = std::env::args_os().collect();

    logging::init(logging::scan_debug(&args));

    let status = vigil_guard::harden();
    if !status.is_protected() {
        log::warn!("process hardening failed; core dumps may contain secrets");
    }

    let auth = match AuthChannel::spawn(ShadowChecker::for_current_user) {
        Ok(auth) => auth,
        Err(e) => {
            log::error!("Failed to start password checker: {}", e);
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = vigil_guard::drop_privileges() {
        log::error!("{}", e);
        return EXIT_FAILURE;
    }

    let config = match config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { EXIT_FAILURE } else { 0 };
        }
    };

    match daemon::run(&config, auth) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            e.exit_code()
        }
    }
}
