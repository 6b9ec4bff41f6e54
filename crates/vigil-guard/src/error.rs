// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vigil-guard.
use thiserror::Error;

/// Errors from [`drop_privileges`](crate::drop_privileges).
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum GuardError {
    /// `setgroups(0, NULL)` failed.
    #[error("unable to clear supplementary groups")]
    SetGroups,

    /// `setgid(getgid())` failed.
    #[error("unable to drop group privileges")]
    SetGid,

    /// `setuid(getuid())` failed.
    #[error("unable to drop user privileges")]
    SetUid,

    /// Root could be regained after the drop.
    #[error("privileges could be regained after dropping them")]
    PrivilegesRegained,
}
