// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Readiness notification and detaching from the terminal.

use std::io;
use std::os::fd::RawFd;

const READY_BYTE: &[u8] = b"\n";

/// Writes the readiness byte to `fd` and closes it.
pub fn send_ready(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is owned by us from here on; READY_BYTE is one valid byte.
    let written = unsafe { libc::write(fd, READY_BYTE.as_ptr().cast(), READY_BYTE.len()) };
    let result = if written == READY_BYTE.len() as isize {
        Ok(())
    } else if written < 0 {
        Err(io::Error::last_os_error())
    } else {
        Err(io::Error::from(io::ErrorKind::WriteZero))
    };

    // SAFETY: closing a descriptor nobody else uses.
    unsafe {
        libc::close(fd);
    }

    result
}

/// Forks into the background.
///
/// Returns in the child, which runs in a new session with `/` as working
/// directory and stdio on `/dev/null`. The parent waits for the child to
/// report success and exits 0, or 1 if it does not, without running any
/// destructor: the child still owns the lock.
pub fn daemonize() -> io::Result<()> {
    let mut fds = [-1 as libc::c_int; 2];

    // SAFETY: fds has room for two descriptors.
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let [read_end, write_end] = fds;

    // SAFETY: single-threaded at this point; both sides only make syscalls.
    match unsafe { libc::fork() } {
        -1 => {
            let err = io::Error::last_os_error();
            // SAFETY: closing our own pipe.
            unsafe {
                libc::close(read_end);
                libc::close(write_end);
            }
            Err(err)
        }
        0 => {
            // SAFETY: only syscalls on descriptors owned by this process.
            unsafe {
                libc::close(read_end);
                libc::setsid();
                redirect_stdio();

                let success: u8 = u8::from(libc::chdir(c"/".as_ptr()) == 0);
                let written = libc::write(write_end, (&success as *const u8).cast(), 1);
                libc::close(write_end);

                if success == 0 || written != 1 {
                    libc::_exit(1);
                }
            }
            Ok(())
        }
        _ => {
            let mut success = 0u8;

            // SAFETY: reading one byte into a local.
            let read = unsafe {
                libc::close(write_end);
                let n = libc::read(read_end, (&mut success as *mut u8).cast(), 1);
                libc::close(read_end);
                n
            };

            if read != 1 || success == 0 {
                log::error!("Failed to daemonize");
                std::process::exit(1);
            }
            std::process::exit(0);
        }
    }
}

unsafe fn redirect_stdio() {
    // SAFETY: caller is the freshly forked child.
    unsafe {
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
        if devnull < 0 {
            return;
        }
        libc::dup2(devnull, libc::STDIN_FILENO);
        libc::dup2(devnull, libc::STDOUT_FILENO);
        libc::dup2(devnull, libc::STDERR_FILENO);
        if devnull > libc::STDERR_FILENO {
            libc::close(devnull);
        }
    }
}
