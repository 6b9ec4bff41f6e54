// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Command line and config file.
//!
//! The config file holds one long option per line, without the leading
//! `--`. Blank lines and lines starting with `#` are skipped. File options
//! are applied first; command-line options override them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

/// Background colour.
pub const DEFAULT_BACKGROUND: u32 = 0xA3A3A3FF;
/// Indicator while typing.
pub const DEFAULT_INPUT: u32 = 0x000000C0;
/// Indicator after the password was cleared.
pub const DEFAULT_CLEARED: u32 = 0xE5A445C0;
/// Indicator while the checker is working.
pub const DEFAULT_VERIFYING: u32 = 0x0072FFC0;
/// Indicator after a rejected password.
pub const DEFAULT_WRONG: u32 = 0xFA0000C0;

/// Fallback for malformed colour strings.
const INVALID_COLOR: u32 = 0xFFFFFFFF;

/// Screen locker for Wayland.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vigil", version, about, long_about = None, args_override_self = true)]
pub struct Config {
    /// Path to the config file.
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Background colour, rrggbb[aa].
    #[arg(short = 'c', long = "color", value_name = "COLOR", value_parser = color_arg, default_value = "a3a3a3ff")]
    pub color: u32,

    /// Enable debug logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Reject empty passwords without checking them.
    #[arg(short = 'e', long = "ignore-empty-password")]
    pub ignore_empty: bool,

    /// Detach from the controlling terminal after locking.
    #[arg(short = 'f', long = "daemonize")]
    pub daemonize: bool,

    /// Write a newline to this file descriptor once locked, then close it.
    #[arg(short = 'R', long = "ready-fd", value_name = "FD")]
    pub ready_fd: Option<i32>,

    /// Show the number of failed attempts.
    #[arg(short = 'F', long = "show-failed-attempts")]
    pub show_failed_attempts: bool,

    /// Indicator edge length in logical pixels.
    #[arg(long = "indicator-size", value_name = "PX", default_value_t = 100)]
    pub indicator_size: u32,

    /// Indicator colour while typing.
    #[arg(long = "input-color", value_name = "COLOR", value_parser = color_arg, default_value = "000000c0")]
    pub input_color: u32,

    /// Indicator colour after clearing.
    #[arg(long = "cleared-color", value_name = "COLOR", value_parser = color_arg, default_value = "e5a445c0")]
    pub cleared_color: u32,

    /// Indicator colour while verifying.
    #[arg(long = "verifying-color", value_name = "COLOR", value_parser = color_arg, default_value = "0072ffc0")]
    pub verifying_color: u32,

    /// Indicator colour after a wrong password.
    #[arg(long = "wrong-color", value_name = "COLOR", value_parser = color_arg, default_value = "fa0000c0")]
    pub wrong_color: u32,
}

impl Config {
    /// Whether lock surfaces can be declared opaque.
    pub fn background_is_opaque(&self) -> bool {
        self.color & 0xFF == 0xFF
    }
}

/// Parses `rrggbb` or `rrggbbaa`, with an optional leading `#`.
///
/// Six digits get alpha `ff`. Anything else yields opaque white.
pub fn parse_color(color: &str) -> u32 {
    let digits = color.strip_prefix('#').unwrap_or(color);

    let parsed = match digits.len() {
        6 | 8 => u32::from_str_radix(digits, 16).ok(),
        _ => None,
    };

    match parsed {
        Some(value) if digits.len() == 6 => (value << 8) | 0xFF,
        Some(value) => value,
        None => {
            log::debug!("Invalid color {}, defaulting to {:#010X}", color, INVALID_COLOR);
            INVALID_COLOR
        }
    }
}

fn color_arg(color: &str) -> Result<u32, String> {
    Ok(parse_color(color))
}

/// Turns config file text into long options.
pub fn file_args(contents: &str) -> Vec<OsString> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            log::debug!("Config Line #{}: {}", number + 1, line);
            OsString::from(format!("--{}", line))
        })
        .collect()
}

/// First readable default config path.
pub fn default_path() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|path| path.is_file())
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".vigil").join("config"));
    }
    if let Some(config) = dirs::config_dir() {
        paths.push(config.join("vigil").join("config"));
    }
    paths.push(PathBuf::from("/etc/vigil/config"));

    paths
}

/// Parses `args` (program name first), merging in the config file.
///
/// The config file is the one named by `-C`, else the first default path
/// that exists. A config file that cannot be read is skipped.
pub fn load(args: &[OsString]) -> Result<Config, clap::Error> {
    let cli = Config::try_parse_from(args)?;

    let path = cli.config.clone().or_else(default_path);
    let Some(path) = path else {
        return Ok(cli);
    };

    log::debug!("Found config at {}", path.display());

    let contents = match read_config(&path) {
        Ok(contents) => contents,
        Err(e) => {
            log::error!("{:#}. Running without it.", e);
            return Ok(cli);
        }
    };

    merge(args, &contents)
}

/// Parses file options followed by `args`.
pub fn merge(args: &[OsString], contents: &str) -> Result<Config, clap::Error> {
    let mut merged: Vec<OsString> = args.iter().take(1).cloned().collect();
    if merged.is_empty() {
        merged.push(OsString::from("vigil"));
    }
    merged.extend(file_args(contents));
    merged.extend(args.iter().skip(1).cloned());

    Config::try_parse_from(merged)
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))
}
