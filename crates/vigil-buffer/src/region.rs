// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! LockedRegion - mmap'd pages with mlock and dump exclusion.
//!
//! Pages stay `PROT_READ | PROT_WRITE` for their whole life: the password
//! is touched on every key press, so toggling protection would only add
//! syscalls on the input path.

use core::ptr::{self, NonNull};

use vigil_util::zeroize;

use crate::error::BufferError;

/// Anonymous, page-aligned memory that is zeroized before it is unmapped.
pub struct LockedRegion {
    ptr: NonNull<u8>,
    len: usize,
    locked: bool,
    dont_dump: bool,
}

// Safety: LockedRegion exclusively owns its mapping.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    /// Maps at least `min_len` bytes (rounded up to whole pages, minimum one
    /// page) and tries to lock them in RAM.
    pub fn new(min_len: usize) -> Result<Self, BufferError> {
        let page_size = page_size();
        let len = min_len.max(1).div_ceil(page_size) * page_size;

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(BufferError::Map);
        }

        let ptr = NonNull::new(ptr as *mut u8).ok_or(BufferError::Map)?;

        let mut region = Self {
            ptr,
            len,
            locked: false,
            dont_dump: false,
        };

        region.locked = region.lock();
        if !region.locked {
            log::warn!("unable to mlock password buffer; it may be swapped to disk");
        }

        region.dont_dump = region.exclude_from_dumps();
        if !region.dont_dump {
            log::warn!("unable to exclude password buffer from core dumps");
        }

        Ok(region)
    }

    fn lock(&self) -> bool {
        unsafe { libc::mlock(self.ptr.as_ptr() as *const libc::c_void, self.len) == 0 }
    }

    #[cfg(target_os = "linux")]
    fn exclude_from_dumps(&self) -> bool {
        unsafe {
            libc::madvise(
                self.ptr.as_ptr() as *mut libc::c_void,
                self.len,
                libc::MADV_DONTDUMP,
            ) == 0
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn exclude_from_dumps(&self) -> bool {
        false
    }

    /// Mapped length in bytes (a multiple of the page size).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a region spans at least one page.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `mlock` succeeded for this region.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether `MADV_DONTDUMP` was applied to this region.
    pub fn is_excluded_from_dumps(&self) -> bool {
        self.dont_dump
    }

    /// The whole mapping.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The whole mapping, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Zeroizes the whole mapping.
    pub fn zeroize(&mut self) {
        zeroize(self.as_mut_slice());
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        self.zeroize();

        unsafe {
            if self.locked {
                libc::munlock(self.ptr.as_ptr() as *const libc::c_void, self.len);
            }
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len);
        }
    }
}

impl core::fmt::Debug for LockedRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockedRegion")
            .field("len", &self.len)
            .field("locked", &self.locked)
            .field("dont_dump", &self.dont_dump)
            .finish_non_exhaustive()
    }
}

fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 { 4096 } else { size as usize }
}
