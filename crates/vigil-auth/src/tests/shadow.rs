// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Tests for ShadowChecker.

use crate::checker::CredentialChecker;
use vigil_util::is_zeroized;

use crate::shadow::{ShadowChecker, with_crypt};

const SETTING: &[u8] = b"$6$vigiltestsalt$\0";

fn hash_of(password: &[u8]) -> Vec<u8> {
    let mut key = password.to_vec();
    key.push(0);

    with_crypt(&key, SETTING, |computed| computed.map(<[u8]>::to_vec)).expect("Failed to with_crypt(..)")
}

// =============================================================================
// check()
// =============================================================================

#[test]
fn test_matching_password_is_accepted() {
    let hash = hash_of(b"hunter2");
    let mut checker = ShadowChecker::from_hash(&hash).expect("Failed to from_hash(..)");

    assert!(checker.check(b"hunter2"));
}

#[test]
fn test_other_passwords_are_rejected() {
    let hash = hash_of(b"hunter2");
    let mut checker = ShadowChecker::from_hash(&hash).expect("Failed to from_hash(..)");

    assert!(!checker.check(b"hunter3"));
    assert!(!checker.check(b"hunter"));
    assert!(!checker.check(b""));
}

#[test]
fn test_interior_nul_is_rejected() {
    let hash = hash_of(b"hunter2");
    let mut checker = ShadowChecker::from_hash(&hash).expect("Failed to from_hash(..)");

    assert!(!checker.check(b"hunter2\0garbage"));
}

#[test]
fn test_locked_account_hash_rejects_everything() {
    let mut checker = ShadowChecker::from_hash(b"!").expect("Failed to from_hash(..)");

    assert!(!checker.check(b""));
    assert!(!checker.check(b"!"));
}

#[test]
fn test_checker_survives_repeated_checks() {
    let hash = hash_of("pässwörd".as_bytes());
    let mut checker = ShadowChecker::from_hash(&hash).expect("Failed to from_hash(..)");

    for _ in 0..3 {
        assert!(!checker.check(b"passwort"));
        assert!(checker.check("pässwörd".as_bytes()));
    }
}

// =============================================================================
// with_crypt()
// =============================================================================

#[test]
fn test_with_crypt_requires_nul_terminators() {
    assert!(with_crypt(b"key", SETTING, |computed| computed.is_none()));
    assert!(with_crypt(b"key\0", b"$6$salt$", |computed| computed.is_none()));
}

#[test]
fn test_with_crypt_wipes_static_hash() {
    let (ptr, len) = with_crypt(b"hunter2\0", SETTING, |computed| {
        let computed = computed.expect("crypt failed");
        assert!(computed.starts_with(b"$6$vigiltestsalt$"));
        (computed.as_ptr(), computed.len())
    });

    // Still libc's static buffer; only the contents changed.
    let leftover = unsafe { core::slice::from_raw_parts(ptr, len) };
    assert!(is_zeroized(leftover));
}

#[test]
fn test_debug_is_redacted() {
    let hash = hash_of(b"hunter2");
    let checker = ShadowChecker::from_hash(&hash).expect("Failed to from_hash(..)");

    let debug = format!("{:?}", checker);
    assert!(!debug.contains("$6$"));
}
