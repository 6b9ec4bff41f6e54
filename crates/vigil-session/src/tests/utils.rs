// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for vigil-session.

use crate::backend::LockBackend;
use crate::error::SessionError;
use crate::event::ServerEvent;
use crate::registry::OutputId;
use crate::session::LockSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RequestLock,
    CreateLockSurface(OutputId, bool),
    AckConfigure(OutputId, u32),
    DestroyLockSurface(OutputId),
    ReleaseOutput(OutputId),
    UnlockAndDestroy,
    Roundtrip,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub fail_roundtrip: bool,
}

impl RecordingBackend {
    pub fn acks(&self) -> Vec<(OutputId, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::AckConfigure(output, serial) => Some((*output, *serial)),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<OutputId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::CreateLockSurface(output, _) => Some(*output),
                _ => None,
            })
            .collect()
    }
}

impl LockBackend for RecordingBackend {
    fn request_lock(&mut self) {
        self.calls.push(Call::RequestLock);
    }

    fn create_lock_surface(&mut self, output: OutputId, opaque: bool) {
        self.calls.push(Call::CreateLockSurface(output, opaque));
    }

    fn ack_configure(&mut self, output: OutputId, serial: u32) {
        self.calls.push(Call::AckConfigure(output, serial));
    }

    fn destroy_lock_surface(&mut self, output: OutputId) {
        self.calls.push(Call::DestroyLockSurface(output));
    }

    fn release_output(&mut self, output: OutputId) {
        self.calls.push(Call::ReleaseOutput(output));
    }

    fn unlock_and_destroy(&mut self) {
        self.calls.push(Call::UnlockAndDestroy);
    }

    fn roundtrip(&mut self) -> Result<(), SessionError> {
        self.calls.push(Call::Roundtrip);

        if self.fail_roundtrip {
            return Err(SessionError::Disconnected("broken pipe".into()));
        }
        Ok(())
    }
}

pub fn global(name: u32, interface: &str) -> ServerEvent {
    ServerEvent::GlobalAdded {
        name,
        interface: interface.into(),
        version: 1,
    }
}

/// Advertises every required global.
pub fn advertise_capabilities(session: &mut LockSession, backend: &mut RecordingBackend) {
    for (name, interface) in [
        (1, "wl_compositor"),
        (3, "wl_shm"),
        (4, "ext_session_lock_manager_v1"),
    ] {
        session
            .handle(backend, global(name, interface))
            .expect("Failed to handle(..)");
    }
}

/// Adds and describes an output.
pub fn add_output(session: &mut LockSession, backend: &mut RecordingBackend, name: u32) {
    session
        .handle(backend, global(name, "wl_output"))
        .expect("Failed to handle(..)");
    session
        .handle(backend, ServerEvent::OutputDone { output: OutputId(name) })
        .expect("Failed to handle(..)");
}

pub fn configure(output: u32, serial: u32) -> ServerEvent {
    ServerEvent::SurfaceConfigure {
        output: OutputId(output),
        serial,
        width: 1920,
        height: 1080,
    }
}

/// A session in `Locked` with the given outputs configured.
pub fn locked_session(outputs: &[u32]) -> (LockSession, RecordingBackend) {
    let mut session = LockSession::new(true);
    let mut backend = RecordingBackend::default();

    advertise_capabilities(&mut session, &mut backend);
    for name in outputs {
        add_output(&mut session, &mut backend, *name);
    }

    session.begin_lock(&mut backend).expect("Failed to begin_lock(..)");
    session
        .handle(&mut backend, ServerEvent::Locked)
        .expect("Failed to handle(..)");

    for (serial, name) in outputs.iter().enumerate() {
        session
            .handle(&mut backend, configure(*name, serial as u32 + 100))
            .expect("Failed to handle(..)");
    }

    backend.calls.clear();

    (session, backend)
}
