// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Byte-level helpers shared by the vigil crates.
//!
//! Everything here works on plain slices so it can be used on mmap'd
//! regions, stack scratch arrays and socket frames alike.

#![cfg_attr(not(test), no_std)]

use core::sync::atomic::{Ordering, compiler_fence};

/// Overwrites every byte of `slice` with zero.
///
/// Uses `write_bytes` (memset) followed by a volatile read and a compiler
/// fence so the store cannot be elided even when the memory is freed right
/// after.
///
/// # Example
///
/// ```
/// use vigil_util::{is_zeroized, zeroize};
///
/// let mut secret = *b"hunter2";
/// zeroize(&mut secret);
/// assert!(is_zeroized(&secret));
/// ```
#[inline(always)]
pub fn zeroize(slice: &mut [u8]) {
    if slice.is_empty() {
        return;
    }

    unsafe {
        core::ptr::write_bytes(slice.as_mut_ptr(), 0, slice.len());
        core::ptr::read_volatile(slice.as_ptr());
    }
    compiler_fence(Ordering::SeqCst);
}

/// Returns `true` if every byte of `slice` is zero.
#[inline(never)]
pub fn is_zeroized(slice: &[u8]) -> bool {
    slice.iter().all(|&b| b == 0)
}

/// Constant-time equality comparison for byte slices.
///
/// The running time depends only on the lengths, never on where the
/// first difference is.
///
/// ```
/// use vigil_util::constant_time_eq;
///
/// assert!(constant_time_eq(b"$6$salt$hash", b"$6$salt$hash"));
/// assert!(!constant_time_eq(b"$6$salt$hash", b"$6$salt$hasi"));
/// ```
#[inline(never)]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));

    unsafe { core::ptr::read_volatile(&diff) == 0 }
}

/// Length in bytes of the last UTF-8 scalar in `bytes`.
///
/// Walks back over continuation bytes (`0b10xx_xxxx`) to the lead byte.
/// Malformed input never removes more than four bytes, and a dangling run
/// of continuation bytes with no lead byte is treated as one unit.
///
/// ```
/// use vigil_util::utf8_tail_len;
///
/// assert_eq!(utf8_tail_len(b""), 0);
/// assert_eq!(utf8_tail_len("ab".as_bytes()), 1);
/// assert_eq!(utf8_tail_len("aé".as_bytes()), 2);
/// assert_eq!(utf8_tail_len("a🦀".as_bytes()), 4);
/// ```
pub fn utf8_tail_len(bytes: &[u8]) -> usize {
    let mut len = 0;

    for &byte in bytes.iter().rev() {
        len += 1;

        let is_continuation = byte & 0xC0 == 0x80;
        if !is_continuation || len == 4 {
            break;
        }
    }

    len
}
