// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::sync::atomic::{AtomicI32, Ordering};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::LoopError;

/// Write end of the installed pipe, or -1.
static SIGNAL_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

/// Converts a signal into a readable descriptor.
///
/// The handler only calls `write(2)` with one byte; the loop drains the
/// pipe and reacts outside signal context. One pipe per process.
#[derive(Debug)]
pub struct SignalPipe {
    read: OwnedFd,
    write: OwnedFd,
    signal: libc::c_int,
}

impl SignalPipe {
    /// Creates the pipe and installs the handler for `signal`.
    pub fn install(signal: libc::c_int) -> Result<Self, LoopError> {
        let mut fds = [-1 as libc::c_int; 2];

        // SAFETY: fds has room for two descriptors.
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
        if rc != 0 {
            return Err(LoopError::Pipe(io::Error::last_os_error()));
        }

        // SAFETY: pipe2 succeeded; both descriptors are fresh and owned here.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

        if SIGNAL_WRITE_FD
            .compare_exchange(-1, write.as_raw_fd(), Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoopError::SignalInUse);
        }

        // SAFETY: a zeroed sigaction is a valid starting point.
        let mut action: libc::sigaction = unsafe { core::mem::zeroed() };
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;

        // SAFETY: action is a valid, initialized sigaction.
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, core::ptr::null_mut())
        };
        if rc != 0 {
            let source = io::Error::last_os_error();
            SIGNAL_WRITE_FD.store(-1, Ordering::Release);
            return Err(LoopError::Sigaction { signal, source });
        }

        log::debug!("signal {} routed to fd {}", signal, read.as_raw_fd());

        Ok(Self {
            read,
            write,
            signal,
        })
    }

    /// The readable end.
    pub fn raw_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// The signal this pipe carries.
    pub fn signal(&self) -> libc::c_int {
        self.signal
    }

    /// Reads every pending byte. Returns how many were read.
    pub fn drain(&self) -> usize {
        let mut buf = [0u8; 64];
        let mut total = 0;

        loop {
            // SAFETY: buf is valid for buf.len() bytes.
            let n = unsafe {
                libc::read(
                    self.read.as_raw_fd(),
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                )
            };

            if n > 0 {
                total += n as usize;
                continue;
            }
            if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }

            return total;
        }
    }
}

impl Drop for SignalPipe {
    fn drop(&mut self) {
        // SAFETY: restoring the default disposition.
        unsafe {
            libc::signal(self.signal, libc::SIG_DFL);
        }

        let _ = SIGNAL_WRITE_FD.compare_exchange(
            self.write.as_raw_fd(),
            -1,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

extern "C" fn on_signal(_signal: libc::c_int) {
    let fd = SIGNAL_WRITE_FD.load(Ordering::Acquire);
    if fd < 0 {
        return;
    }

    // SAFETY: errno is thread-local; write(2) is async-signal-safe.
    unsafe {
        let errno = libc::__errno_location();
        let saved = *errno;

        let byte = 1u8;
        libc::write(fd, (&byte as *const u8).cast(), 1);

        *errno = saved;
    }
}
