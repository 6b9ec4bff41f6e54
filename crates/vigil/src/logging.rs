// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Logger setup.
//!
//! The level must be known before the checker is forked, so `--debug` is
//! picked out of the raw arguments ahead of the real parse.

use std::ffi::OsString;

use log::LevelFilter;

/// Whether `-d`/`--debug` appears among `args` (program name excluded).
///
/// Understands bundled short flags (`-ed`) and stops at `--`.
pub fn scan_debug(args: &[OsString]) -> bool {
    for arg in args.iter().skip(1) {
        let Some(arg) = arg.to_str() else {
            continue;
        };

        if arg == "--" {
            break;
        }
        if arg == "--debug" {
            return true;
        }
        if let Some(short) = arg.strip_prefix('-') {
            if short.starts_with('-') || short.is_empty() {
                continue;
            }
            // Stop at the first flag that takes a value; the rest is that value.
            for flag in short.chars() {
                match flag {
                    'd' => return true,
                    'C' | 'c' | 'R' => break,
                    _ => {}
                }
            }
        }
    }

    false
}

/// Level for the given debug flag.
pub fn level(debug: bool) -> LevelFilter {
    if debug { LevelFilter::Debug } else { LevelFilter::Error }
}

/// Installs `env_logger` on stderr. `RUST_LOG` still overrides.
pub fn init(debug: bool) {
    let _ = env_logger::Builder::new()
        .filter_level(level(debug))
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
