// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Tests for Readiness.

use crate::readiness::Readiness;

#[test]
fn test_interest_maps_to_poll_events() {
    assert_eq!(Readiness::READABLE.to_poll_events(), libc::POLLIN);
    assert_eq!(Readiness::WRITABLE.to_poll_events(), libc::POLLOUT);
    assert_eq!(
        (Readiness::READABLE | Readiness::WRITABLE).to_poll_events(),
        libc::POLLIN | libc::POLLOUT
    );

    // Failure conditions are always reported, never requested.
    assert_eq!(Readiness::HANGUP.to_poll_events(), 0);
}

#[test]
fn test_revents_map_to_readiness() {
    assert_eq!(Readiness::from_revents(libc::POLLIN), Readiness::READABLE);
    assert_eq!(
        Readiness::from_revents(libc::POLLIN | libc::POLLHUP),
        Readiness::READABLE | Readiness::HANGUP
    );
    assert_eq!(Readiness::from_revents(libc::POLLERR), Readiness::ERROR);
    assert_eq!(Readiness::from_revents(libc::POLLNVAL), Readiness::INVALID);
    assert_eq!(Readiness::from_revents(0), Readiness::empty());
}

#[test]
fn test_is_failure() {
    assert!(!Readiness::READABLE.is_failure());
    assert!(!(Readiness::READABLE | Readiness::WRITABLE).is_failure());
    assert!(Readiness::HANGUP.is_failure());
    assert!((Readiness::READABLE | Readiness::ERROR).is_failure());
    assert!(Readiness::INVALID.is_failure());
}
