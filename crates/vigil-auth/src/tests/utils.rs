// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for vigil-auth.

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crate::channel::{AuthChannel, Reply};
use crate::checker::{CredentialChecker, serve};
use crate::error::AuthError;
use crate::wire::Verdict;

pub const PASSWORD: &[u8] = b"hunter2";

/// Accepts [`PASSWORD`] and counts every call.
#[derive(Clone, Default)]
pub struct CountingChecker {
    pub calls: Arc<AtomicUsize>,
}

impl CountingChecker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialChecker for CountingChecker {
    fn check(&mut self, secret: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        secret == PASSWORD
    }
}

/// A channel whose checker runs `serve` on a thread.
pub fn threaded_channel() -> (AuthChannel, CountingChecker, JoinHandle<Result<(), AuthError>>) {
    let (parent, mut child) = UnixStream::pair().expect("Failed to pair()");
    let checker = CountingChecker::default();

    let mut thread_checker = checker.clone();
    let handle = std::thread::spawn(move || serve(&mut child, &mut thread_checker));

    let channel = AuthChannel::from_stream(parent).expect("Failed to from_stream(..)");

    (channel, checker, handle)
}

/// Blocks (bounded) until the channel fd is readable.
pub fn wait_readable(channel: &AuthChannel) {
    let mut pfd = libc::pollfd {
        fd: channel.raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };

    let rc = unsafe { libc::poll(&mut pfd, 1, 5_000) };
    assert!(rc > 0, "channel never became readable");
}

/// Waits for and returns the next verdict.
pub fn wait_verdict(channel: &mut AuthChannel) -> Verdict {
    loop {
        wait_readable(channel);

        match channel.poll_reply().expect("Failed to poll_reply()") {
            Reply::Verdict(verdict) => return verdict,
            Reply::Pending => continue,
        }
    }
}
