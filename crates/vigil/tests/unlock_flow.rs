// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Password attempts against a checker thread, through the public API.

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vigil::locker::{Fatal, KeyAction, Locker};
use vigil_auth::{AuthChannel, serve};
use vigil_session::{AuthState, LockBackend, LockState, OutputId, ServerEvent, SessionError};

const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct Compositor {
    surfaces: Vec<OutputId>,
    acked: Vec<u32>,
    unlocked: bool,
}

impl LockBackend for Compositor {
    fn request_lock(&mut self) {}

    fn create_lock_surface(&mut self, output: OutputId, _opaque: bool) {
        self.surfaces.push(output);
    }

    fn ack_configure(&mut self, _output: OutputId, serial: u32) {
        self.acked.push(serial);
    }

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

fn startup_events() -> Vec<ServerEvent> {
    let mut events: Vec<ServerEvent> = [
        "wl_compositor",
        "wl_shm",
        "ext_session_lock_manager_v1",
    ]
    .iter()
    .enumerate()
    .map(|(i, interface)| ServerEvent::GlobalAdded {
        name: i as u32 + 1,
        interface: interface.to_string(),
        version: 1,
    })
    .collect();

    events.push(ServerEvent::GlobalAdded {
        name: 40,
        interface: "wl_output".to_string(),
        version: 4,
    });
    events.push(ServerEvent::OutputDone { output: OutputId(40) });

    events
}

fn locker() -> (Locker<Compositor>, Arc<AtomicUsize>) {
    let (parent, mut child) = UnixStream::pair().expect("Failed to pair()");
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    std::thread::spawn(move || {
        let mut checker = |secret: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
            secret == PASSWORD.as_bytes()
        };
        serve(&mut child, &mut checker)
    });

    let channel = AuthChannel::from_stream(parent).expect("Failed to from_stream(..)");
    let mut locker = Locker::new(Compositor::default(), channel, true, true).expect("Failed to new(..)");

    for event in startup_events() {
        locker.handle_event(event).expect("Failed to handle_event(..)");
    }
    locker.begin_lock().expect("Failed to begin_lock()");
    locker
        .handle_event(ServerEvent::SurfaceConfigure {
            output: OutputId(40),
            serial: 7,
            width: 1920,
            height: 1080,
        })
        .expect("Failed to handle_event(..)");
    locker
        .handle_event(ServerEvent::Locked)
        .expect("Failed to handle_event(..)");

    (locker, calls)
}

fn attempt(locker: &mut Locker<Compositor>, password: &str) {
    for ch in password.chars() {
        locker.key(KeyAction::Char(ch)).expect("Failed to key(..)");
    }
    locker.key(KeyAction::Submit).expect("Failed to key(..)");

    let mut pfd = libc::pollfd {
        fd: locker.auth_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pfd, 1, 5_000) };
    assert!(rc > 0, "checker never answered");

    locker.on_auth_ready().expect("Failed to on_auth_ready()");
}

#[test]
fn test_three_failures_then_unlock() {
    let (mut locker, calls) = locker();
    assert_eq!(locker.backend().acked, vec![7]);
    assert_eq!(locker.backend().surfaces, vec![OutputId(40)]);

    for guess in ["hunter2", "letmein", "Correct horse"] {
        attempt(&mut locker, guess);
        assert_eq!(locker.session().auth_state(), AuthState::Invalid);
        assert!(locker.running());
    }
    assert_eq!(locker.session().failed_attempts(), 3);

    attempt(&mut locker, PASSWORD);

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(locker.session().failed_attempts(), 3);
    assert_eq!(locker.session().state(), LockState::Destroyed);
    assert!(!locker.running());
    assert!(locker.backend().unlocked);
    assert!(locker.backend().surfaces.is_empty());
}

#[test]
fn test_empty_submission_never_reaches_checker() {
    let (mut locker, calls) = locker();

    locker.key(KeyAction::Submit).expect("Failed to key(..)");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(locker.session().failed_attempts(), 1);
}

#[test]
fn test_finished_exits_with_lock_denied() {
    let (mut locker, _) = locker();

    let fatal = locker
        .handle_event(ServerEvent::Finished)
        .expect_err("finished must end the session");

    assert!(matches!(fatal, Fatal::Session(SessionError::LockDenied)));
    assert_eq!(fatal.exit_code(), 2);
    assert!(locker.session().finished());
}
