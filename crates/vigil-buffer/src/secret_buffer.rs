// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use vigil_util::{utf8_tail_len, zeroize};

use crate::error::BufferError;
use crate::region::LockedRegion;

/// Hard upper bound on a password, in bytes.
///
/// Also the largest payload the authentication channel will frame.
pub const MAX_SECRET_LEN: usize = 1024;

/// Capacity a [`SecretBuffer::new`] buffer starts with.
pub const INITIAL_CAPACITY: usize = 256;

/// The password under construction.
///
/// Content lives in a [`LockedRegion`]; no byte of it ever touches the
/// general heap. When capacity is exceeded, `SecretBuffer` grows to the next
/// power of two (capped at its limit). If the mapped region is too small
/// for the new capacity it:
/// 1. Maps a new region
/// 2. Copies the current content
/// 3. Zeroizes and unmaps the old region
///
/// Capacity never shrinks.
pub struct SecretBuffer {
    region: LockedRegion,
    len: usize,
    capacity: usize,
    limit: usize,
}

impl SecretBuffer {
    /// Creates an empty buffer with [`INITIAL_CAPACITY`] that may grow up
    /// to [`MAX_SECRET_LEN`].
    pub fn new() -> Result<Self, BufferError> {
        Self::with_limit(INITIAL_CAPACITY, MAX_SECRET_LEN)
    }

    /// Creates an empty buffer with the given initial capacity and limit.
    pub fn with_limit(initial: usize, limit: usize) -> Result<Self, BufferError> {
        if initial == 0 || initial > limit {
            return Err(BufferError::InvalidCapacity { initial, limit });
        }

        Ok(Self {
            region: LockedRegion::new(initial)?,
            len: 0,
            capacity: initial,
            limit,
        })
    }

    /// Returns the content length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the hard upper bound on the content length.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the backing memory is locked in RAM.
    pub fn is_memory_locked(&self) -> bool {
        self.region.is_locked()
    }

    /// The current content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.region.as_slice()[..self.len]
    }

    /// Appends `bytes`, growing if needed.
    ///
    /// Fails without modifying the buffer if the result would exceed the
    /// limit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        let requested = self.len + bytes.len();

        if requested > self.limit {
            return Err(BufferError::CapacityExceeded {
                requested,
                limit: self.limit,
            });
        }

        self.maybe_grow_to(requested)?;

        self.region.as_mut_slice()[self.len..requested].copy_from_slice(bytes);
        self.len = requested;

        Ok(())
    }

    /// Appends the UTF-8 encoding of `ch`.
    ///
    /// The stack scratch used for encoding is zeroized before returning.
    pub fn push_char(&mut self, ch: char) -> Result<(), BufferError> {
        let mut scratch = [0u8; 4];
        let encoded_len = ch.encode_utf8(&mut scratch).len();

        let result = self.append(&scratch[..encoded_len]);
        zeroize(&mut scratch);

        result
    }

    /// Removes the last UTF-8 scalar value. No-op when empty.
    pub fn delete_last_char(&mut self) {
        if self.len == 0 {
            return;
        }

        let tail = utf8_tail_len(self.as_bytes());
        let start = self.len - tail;

        zeroize(&mut self.region.as_mut_slice()[start..self.len]);
        self.len = start;
    }

    /// Zeroizes the whole backing region and resets the length.
    ///
    /// Keeps the allocation.
    pub fn clear(&mut self) {
        self.region.zeroize();
        self.len = 0;
    }

    fn maybe_grow_to(&mut self, min_capacity: usize) -> Result<(), BufferError> {
        if self.capacity >= min_capacity {
            return Ok(());
        }

        let new_capacity = min_capacity.next_power_of_two().min(self.limit);

        if new_capacity > self.region.len() {
            let mut region = LockedRegion::new(new_capacity)?;
            region.as_mut_slice()[..self.len].copy_from_slice(self.as_bytes());

            // The old region is zeroized and unmapped by its Drop.
            self.region = region;
        }

        self.capacity = new_capacity;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn region_bytes(&self) -> &[u8] {
        self.region.as_slice()
    }

    #[cfg(test)]
    pub(crate) fn region_addr(&self) -> usize {
        self.region.as_slice().as_ptr() as usize
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl core::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
