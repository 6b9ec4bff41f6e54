// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::ffi::c_char;
use std::ffi::CStr;

use vigil_buffer::{MAX_SECRET_LEN, SecretBuffer};
use vigil_util::{constant_time_eq, zeroize};

use crate::checker::CredentialChecker;
use crate::error::AuthError;

#[link(name = "crypt")]
unsafe extern "C" {
    fn crypt(key: *const c_char, setting: *const c_char) -> *mut c_char;
}

/// Checks passwords against the invoking user's `crypt(3)` hash.
///
/// Both the hash and the NUL-terminated candidate live in locked,
/// zeroizing buffers.
pub struct ShadowChecker {
    // NUL-terminated.
    hash: SecretBuffer,
    candidate: SecretBuffer,
}

impl ShadowChecker {
    /// Loads the hash of the user running this process.
    ///
    /// Reads `/etc/shadow` through `getspnam` when the passwd entry holds
    /// the `x` placeholder, which needs the privileges the locker starts
    /// with.
    pub fn for_current_user() -> Result<Self, AuthError> {
        // SAFETY: getuid never fails.
        let uid = unsafe { libc::getuid() };

        // SAFETY: the returned entry points into libc static storage; it is
        // copied out before any other passwd call.
        let pw = unsafe { libc::getpwuid(uid) };
        if pw.is_null() {
            return Err(AuthError::UnknownUser(uid));
        }

        // SAFETY: pw is non-null and its fields are valid C strings.
        let (name, passwd) = unsafe { ((*pw).pw_name, (*pw).pw_passwd) };
        let mut hash_ptr: *const c_char = passwd;

        // SAFETY: passwd is a valid C string (checked non-null first).
        if !passwd.is_null() && unsafe { CStr::from_ptr(passwd) }.to_bytes() == b"x" {
            // SAFETY: name comes from the same passwd entry.
            let sp = unsafe { libc::getspnam(name) };
            if sp.is_null() {
                log::error!("could not read shadow entry for uid {}", uid);
                return Err(AuthError::UnknownUser(uid));
            }
            // SAFETY: sp is non-null.
            hash_ptr = unsafe { (*sp).sp_pwdp };
        }

        if hash_ptr.is_null() {
            return Err(AuthError::UnknownUser(uid));
        }

        // SAFETY: hash_ptr is a valid, non-null C string.
        let hash = unsafe { CStr::from_ptr(hash_ptr) }.to_bytes();
        log::debug!("loaded password hash for uid {}", uid);

        Self::from_hash(hash)
    }

    /// Builds a checker for an explicit `crypt(3)` hash string.
    pub fn from_hash(hash: &[u8]) -> Result<Self, AuthError> {
        let mut stored = SecretBuffer::with_limit(hash.len() + 1, hash.len() + 1)?;
        stored.append(hash)?;
        stored.append(&[0])?;

        Ok(Self {
            hash: stored,
            candidate: SecretBuffer::with_limit(MAX_SECRET_LEN + 1, MAX_SECRET_LEN + 1)?,
        })
    }
}

impl CredentialChecker for ShadowChecker {
    fn check(&mut self, secret: &[u8]) -> bool {
        // Interior NULs would truncate the key.
        if secret.contains(&0) {
            return false;
        }

        self.candidate.clear();
        if self.candidate.append(secret).is_err() || self.candidate.append(&[0]).is_err() {
            self.candidate.clear();
            return false;
        }

        let hash = self.hash.as_bytes();
        let matches = with_crypt(self.candidate.as_bytes(), hash, |computed| match computed {
            Some(computed) => constant_time_eq(computed, &hash[..hash.len() - 1]),
            None => false,
        });
        self.candidate.clear();

        matches
    }
}

impl core::fmt::Debug for ShadowChecker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShadowChecker").finish_non_exhaustive()
    }
}

/// Runs `crypt(3)` on NUL-terminated `key` and `setting` and hands the
/// hash to `f`; `None` when either argument is unterminated or crypt fails.
///
/// The hash lives in libc's static buffer. It is wiped once `f` returns,
/// so it cannot escape the closure.
pub(crate) fn with_crypt<R>(key: &[u8], setting: &[u8], f: impl FnOnce(Option<&[u8]>) -> R) -> R {
    if key.last() != Some(&0) || setting.last() != Some(&0) {
        return f(None);
    }

    // SAFETY: both arguments are NUL-terminated and outlive the call.
    let out = unsafe { crypt(key.as_ptr().cast(), setting.as_ptr().cast()) };
    if out.is_null() {
        return f(None);
    }

    // SAFETY: crypt returned a valid C string in writable static storage
    // that nothing else touches until the next crypt call.
    let computed = unsafe {
        let len = CStr::from_ptr(out).to_bytes().len();
        core::slice::from_raw_parts_mut(out.cast::<u8>(), len)
    };

    // libxcrypt signals errors with a string starting with '*'.
    let result = if computed.first() == Some(&b'*') {
        f(None)
    } else {
        f(Some(computed))
    };
    zeroize(computed);

    result
}
