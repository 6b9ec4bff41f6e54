// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Non-swappable, self-zeroing storage for the password being typed.
//!
//! # Buffer Types
//!
//! ## LockedRegion
//!
//! Page-granular anonymous mapping:
//! - Uses `mmap` for allocation, never the general heap
//! - Best-effort `mlock` to keep the pages out of swap
//! - Best-effort `madvise(MADV_DONTDUMP)` to keep them out of core files
//! - Zeroized before `munmap` on drop
//!
//! ## SecretBuffer
//!
//! Growable byte buffer on top of a `LockedRegion`:
//! - `append`, `push_char`, `delete_last_char` (UTF-8 aware) and `clear`
//! - Capacity only grows, in powers of two, up to a fixed limit
//! - Growing past the mapped region maps a new one, copies, and zeroizes
//!   the old region before releasing it
//!
//! Failure to lock or to exclude memory from dumps is logged and
//! otherwise ignored: a locker that refuses to start is worse than one
//! whose password might reach swap.
//!
//! # Example
//!
//! ```rust
//! use vigil_buffer::{BufferError, SecretBuffer};
//!
//! fn example() -> Result<(), BufferError> {
//!     let mut password = SecretBuffer::new()?;
//!
//!     password.append(b"hunter")?;
//!     password.push_char('ß')?;
//!     password.delete_last_char();
//!     assert_eq!(password.as_bytes(), b"hunter");
//!
//!     password.clear();
//!     assert!(password.is_empty());
//!
//!     // Region is zeroized and unmapped on drop
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(test)]
mod tests;

mod error;
mod region;
mod secret_buffer;

pub use error::BufferError;
pub use region::LockedRegion;
pub use secret_buffer::{INITIAL_CAPACITY, MAX_SECRET_LEN, SecretBuffer};
