// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! vigil_guard - Process hardening and privilege drop
//!
//! [`harden`] makes the process non-dumpable and caps core files at zero
//! bytes, so a crash while a password is being typed cannot write it to
//! disk and a same-uid debugger cannot attach. Calling it again is
//! harmless and reports the same status.
//!
//! [`drop_privileges`] gives up setuid/setgid privileges. The locker calls
//! it right after the checker subprocess has been forked, so only the
//! checker keeps the rights needed to read the shadow database.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]


mod error;

pub use error::GuardError;

/// Outcome of [`harden`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardStatus {
    /// Whether `prctl(PR_SET_DUMPABLE, 0)` succeeded.
    ///
    /// Blocks ptrace attachment from same-uid processes and core dumps.
    pub not_dumpable: bool,

    /// Whether `setrlimit(RLIMIT_CORE, 0)` succeeded.
    pub core_limit_zero: bool,
}

impl GuardStatus {
    /// Returns `true` if at least one protection is active.
    pub fn is_protected(&self) -> bool {
        self.not_dumpable || self.core_limit_zero
    }
}

/// Hardens the process against core dumps and ptrace.
///
/// Issues `prctl(PR_SET_DUMPABLE, 0)` and `setrlimit(RLIMIT_CORE, 0)`.
/// Failures are reported through the returned status and are never fatal.
///
/// # Example
///
/// ```
/// let status = vigil_guard::harden();
/// if !status.is_protected() {
///     eprintln!("running without core dump protection");
/// }
/// ```
pub fn harden() -> GuardStatus {
    GuardStatus {
        not_dumpable: prctl_set_not_dumpable(),
        core_limit_zero: setrlimit_core_zero(),
    }
}

#[cfg(target_os = "linux")]
fn prctl_set_not_dumpable() -> bool {
    unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) == 0 }
}

#[cfg(not(target_os = "linux"))]
fn prctl_set_not_dumpable() -> bool {
    false
}

fn setrlimit_core_zero() -> bool {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) == 0 }
}

/// Drops setuid/setgid privileges back to the real user and group.
///
/// Supplementary groups are cleared first when running as root on behalf
/// of another user. After the drop, regaining root must be impossible;
/// if `setuid(0)` still succeeds the call fails with
/// [`GuardError::PrivilegesRegained`].
///
/// A process that was never privileged is left untouched.
pub fn drop_privileges() -> Result<(), GuardError> {
    let (uid, euid) = unsafe { (libc::getuid(), libc::geteuid()) };
    let (gid, egid) = unsafe { (libc::getgid(), libc::getegid()) };

    if euid == 0 && uid != 0 && unsafe { libc::setgroups(0, core::ptr::null()) } != 0 {
        return Err(GuardError::SetGroups);
    }

    if gid != egid && unsafe { libc::setgid(gid) } != 0 {
        return Err(GuardError::SetGid);
    }

    if uid != euid && unsafe { libc::setuid(uid) } != 0 {
        return Err(GuardError::SetUid);
    }

    if uid != 0 && unsafe { libc::setuid(0) } == 0 {
        return Err(GuardError::PrivilegesRegained);
    }

    Ok(())
}
