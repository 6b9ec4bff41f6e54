// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for vigil.

use std::os::fd::RawFd;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use vigil_auth::{AuthChannel, AuthError, serve};
use vigil_session::{LockBackend, OutputId, ServerEvent, SessionError};

use crate::locker::Locker;

pub const PASSWORD: &[u8] = b"hunter2";

#[derive(Debug, Default)]
pub struct MockBackend {
    pub lock_requested: bool,
    pub surfaces: Vec<OutputId>,
    pub unlocked: bool,
}

impl LockBackend for MockBackend {
    fn request_lock(&mut self) {
        self.lock_requested = true;
    }

    fn create_lock_surface(&mut self, output: OutputId, _opaque: bool) {
        self.surfaces.push(output);
    }

    fn ack_configure(&mut self, _output: OutputId, _serial: u32) {}

    fn destroy_lock_surface(&mut self, output: OutputId) {
        self.surfaces.retain(|id| *id != output);
    }

    fn release_output(&mut self, _output: OutputId) {}

    fn unlock_and_destroy(&mut self) {
        self.unlocked = true;
    }

    fn roundtrip(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Checker thread accepting [`PASSWORD`], plus a call counter.
pub fn checker_channel() -> (AuthChannel, Arc<AtomicUsize>, JoinHandle<Result<(), AuthError>>) {
    let (parent, mut child) = UnixStream::pair().expect("Failed to pair()");
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let handle = std::thread::spawn(move || {
        let mut checker = |secret: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
            secret == PASSWORD
        };
        serve(&mut child, &mut checker)
    });

    let channel = AuthChannel::from_stream(parent).expect("Failed to from_stream(..)");

    (channel, calls, handle)
}

/// Drives a fresh locker to the locked state.
pub fn lock(locker: &mut Locker<MockBackend>) {
    for interface in [
        "wl_compositor",
        "wl_shm",
        "ext_session_lock_manager_v1",
    ] {
        locker
            .handle_event(ServerEvent::GlobalAdded {
                name: 0,
                interface: interface.to_string(),
                version: 1,
            })
            .expect("Failed to handle_event(..)");
    }

    locker.begin_lock().expect("Failed to begin_lock()");
    locker
        .handle_event(ServerEvent::Locked)
        .expect("Failed to handle_event(..)");
}

/// A locked locker talking to a checker thread.
pub fn locked_locker(ignore_empty: bool) -> (Locker<MockBackend>, Arc<AtomicUsize>) {
    let (channel, calls, _handle) = checker_channel();
    let mut locker =
        Locker::new(MockBackend::default(), channel, true, ignore_empty).expect("Failed to new(..)");
    lock(&mut locker);

    (locker, calls)
}

/// Blocks (bounded) until `fd` is readable.
pub fn wait_readable(fd: RawFd) {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let rc = unsafe { libc::poll(&mut pfd, 1, 5_000) };
    assert!(rc > 0, "descriptor never became readable");
}
