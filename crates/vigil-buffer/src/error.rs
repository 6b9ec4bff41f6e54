// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vigil-buffer.
use thiserror::Error;

/// Errors that can occur when working with secret buffers.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum BufferError {
    /// `mmap` could not provide the region.
    #[error("mmap failed")]
    Map,

    /// An append would grow the content past the buffer's limit.
    #[error("secret of {requested} bytes exceeds the {limit} byte limit")]
    CapacityExceeded {
        /// Length the content would have had.
        requested: usize,
        /// Hard upper bound on the content length.
        limit: usize,
    },

    /// Initial capacity was zero or larger than the limit.
    #[error("initial capacity {initial} is not within 1..={limit}")]
    InvalidCapacity {
        /// Requested initial capacity.
        initial: usize,
        /// Requested limit.
        limit: usize,
    },
}
