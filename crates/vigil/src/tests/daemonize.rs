// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Tests for the readiness notification.

use crate::daemonize::send_ready;

#[test]
fn test_send_ready_writes_newline_and_closes() {
    let mut fds = [-1; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    let [read_end, write_end] = fds;

    send_ready(write_end).expect("Failed to send_ready(..)");

    let mut buf = [0u8; 4];
    let n = unsafe { libc::read(read_end, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(n, 1);
    assert_eq!(buf[0], b'\n');

    // Write end closed: EOF.
    let n = unsafe { libc::read(read_end, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(n, 0);

    unsafe { libc::close(read_end) };
}

#[test]
fn test_send_ready_on_bad_fd_fails() {
    assert!(send_ready(-1).is_err());
}
