// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::time::Duration;

use vigil_auth::Verdict;

use crate::backend::LockBackend;
use crate::error::SessionError;
use crate::event::ServerEvent;
use crate::registry::{Frame, OutputId, OutputRegistry};

/// How long the indicator shows a rejected password before going idle.
pub const AUTH_IDLE_DELAY: Duration = Duration::from_secs(3);

const OUTPUT_INTERFACE: &str = "wl_output";

bitflags::bitflags! {
    /// Globals required to lock.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// `wl_compositor`.
        const COMPOSITOR = 1 << 0;
        /// `wl_shm`.
        const SHM = 1 << 1;
        /// `ext_session_lock_manager_v1`.
        const SESSION_LOCK = 1 << 2;
    }
}

impl Capabilities {
    const INTERFACES: [(Capabilities, &'static str); 3] = [
        (Capabilities::COMPOSITOR, "wl_compositor"),
        (Capabilities::SHM, "wl_shm"),
        (Capabilities::SESSION_LOCK, "ext_session_lock_manager_v1"),
    ];

    /// Maps an interface name to its capability.
    pub fn from_interface(interface: &str) -> Option<Self> {
        Self::INTERFACES
            .iter()
            .find(|(_, name)| *name == interface)
            .map(|(capability, _)| *capability)
    }

    /// Interface name of the first capability missing from `self`.
    pub fn first_missing(self) -> Option<&'static str> {
        Self::INTERFACES
            .iter()
            .find(|(capability, _)| !self.contains(*capability))
            .map(|(_, name)| *name)
    }
}

/// Lifecycle of the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Collecting globals; nothing requested yet.
    Connecting,
    /// `lock` sent, waiting for `locked` or `finished`.
    AwaitingLockGrant,
    /// The compositor confirmed the lock.
    Locked,
    /// Unlock in progress.
    Unlocking,
    /// Unlocked and torn down. Terminal.
    Destroyed,
    /// The compositor sent `finished`. Terminal.
    Denied,
}

/// What the indicator shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing to show.
    #[default]
    Idle,
    /// A character was typed.
    Input,
    /// A character was deleted.
    Backspace,
    /// The password was cleared.
    Cleared,
    /// Waiting for a verdict.
    Validating,
    /// The last password was wrong.
    Invalid,
}

/// What the caller should do after a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep the lock.
    Continue,
    /// Call [`LockSession::unlock`].
    Unlock,
}

/// One lock session, driven by [`ServerEvent`]s.
///
/// Once `Denied`, no further [`LockBackend`] request is issued.
#[derive(Debug)]
pub struct LockSession {
    state: LockState,
    capabilities: Capabilities,
    outputs: OutputRegistry,
    failed_attempts: u32,
    auth_state: AuthState,
    opaque: bool,
}

impl LockSession {
    /// A session whose lock surfaces get an opaque region when `opaque`.
    pub fn new(opaque: bool) -> Self {
        Self {
            state: LockState::Connecting,
            capabilities: Capabilities::empty(),
            outputs: OutputRegistry::new(),
            failed_attempts: 0,
            auth_state: AuthState::Idle,
            opaque,
        }
    }

    /// Current state.
    pub fn state(&self) -> LockState {
        self.state
    }

    /// The compositor granted the lock and it was not released yet.
    pub fn locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// The compositor sent `finished`.
    pub fn finished(&self) -> bool {
        self.state == LockState::Denied
    }

    /// Required globals seen so far.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Known outputs.
    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    /// Rejected passwords so far.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// What the indicator shows.
    pub fn auth_state(&self) -> AuthState {
        self.auth_state
    }

    /// Changes the indicator and schedules a redraw of every surface.
    pub fn set_auth_state(&mut self, auth_state: AuthState) {
        self.auth_state = auth_state;
        self.outputs.mark_all_dirty();
    }

    /// Auth-idle timer expired: drop back to `Idle` unless a check is
    /// running.
    pub fn auth_idle(&mut self) {
        if self.auth_state != AuthState::Validating && self.auth_state != AuthState::Idle {
            self.set_auth_state(AuthState::Idle);
        }
    }

    /// Configured surfaces due for a redraw.
    pub fn take_dirty(&mut self) -> Vec<Frame> {
        self.outputs.take_dirty()
    }

    /// Checks the required globals and requests the lock.
    ///
    /// Lock surfaces are created right away for outputs that are already
    /// described; later outputs get theirs on their first `done`.
    pub fn begin_lock<B: LockBackend>(&mut self, backend: &mut B) -> Result<(), SessionError> {
        match self.state {
            LockState::Connecting => {}
            LockState::Denied => return Err(SessionError::LockDenied),
            _ => return Err(SessionError::AlreadyRequested),
        }

        if let Some(missing) = self.capabilities.first_missing() {
            log::error!("Missing {}", missing);
            return Err(SessionError::MissingCapability(missing));
        }

        backend.request_lock();
        self.state = LockState::AwaitingLockGrant;
        log::debug!("session lock requested");

        for id in self.outputs.awaiting_surface() {
            self.create_surface(backend, id);
        }

        Ok(())
    }

    /// Dispatches one event.
    pub fn handle<B: LockBackend>(&mut self, backend: &mut B, event: ServerEvent) -> Result<(), SessionError> {
        if self.state == LockState::Denied {
            return Err(SessionError::LockDenied);
        }

        match event {
            ServerEvent::GlobalAdded { name, interface, version } => {
                if let Some(capability) = Capabilities::from_interface(&interface) {
                    log::debug!("global {} v{} (name {})", interface, version, name);
                    self.capabilities |= capability;
                } else if interface == OUTPUT_INTERFACE {
                    log::debug!("new output {}", OutputId(name));
                    self.outputs.add(OutputId(name));
                }
            }
            ServerEvent::GlobalRemoved { name } => self.remove_output(backend, OutputId(name)),
            ServerEvent::OutputGeometry { output, subpixel } => {
                self.outputs.set_subpixel(output, subpixel);
            }
            ServerEvent::OutputScale { output, scale } => {
                self.outputs.set_scale(output, scale);
            }
            ServerEvent::OutputName { output, name } => {
                self.outputs.set_name(output, name);
            }
            ServerEvent::OutputDone { output } => {
                if self.outputs.mark_done(output) && self.lock_requested() {
                    self.create_surface(backend, output);
                }
            }
            ServerEvent::Locked => match self.state {
                LockState::AwaitingLockGrant => {
                    log::debug!("session locked");
                    self.state = LockState::Locked;
                }
                _ => return Err(SessionError::Protocol("locked without a pending lock request")),
            },
            ServerEvent::Finished => {
                log::error!("Failed to lock session -- is another lockscreen running?");
                self.state = LockState::Denied;
                return Err(SessionError::LockDenied);
            }
            ServerEvent::SurfaceConfigure {
                output,
                serial,
                width,
                height,
            } => match self.outputs.configure(output, serial, width, height) {
                Some(serial) => backend.ack_configure(output, serial),
                None => log::debug!("configure for unknown surface on {}", output),
            },
        }

        Ok(())
    }

    /// Releases the lock.
    pub fn unlock<B: LockBackend>(&mut self, backend: &mut B) -> Result<(), SessionError> {
        if self.state != LockState::Locked {
            return Err(SessionError::NotLocked);
        }

        self.state = LockState::Unlocking;

        let ids: Vec<OutputId> = self.outputs.ids().collect();
        for id in ids {
            if self.outputs.detach_surface(id).is_some() {
                backend.destroy_lock_surface(id);
            }
        }

        backend.unlock_and_destroy();
        backend.roundtrip()?;

        self.state = LockState::Destroyed;
        log::debug!("session unlocked");

        Ok(())
    }

    /// Applies the checker's verdict.
    pub fn apply_verdict(&mut self, verdict: Verdict) -> Flow {
        if verdict.is_success() {
            return Flow::Unlock;
        }

        self.failed_attempts += 1;
        log::debug!("authentication failed ({} attempts)", self.failed_attempts);
        self.set_auth_state(AuthState::Invalid);

        Flow::Continue
    }

    fn lock_requested(&self) -> bool {
        matches!(self.state, LockState::AwaitingLockGrant | LockState::Locked)
    }

    fn create_surface<B: LockBackend>(&mut self, backend: &mut B, id: OutputId) {
        if self.outputs.attach_surface(id, self.opaque) {
            backend.create_lock_surface(id, self.opaque);
        }
    }

    fn remove_output<B: LockBackend>(&mut self, backend: &mut B, id: OutputId) {
        let Some(output) = self.outputs.remove(id) else {
            return;
        };

        log::debug!("output {} removed", id);

        if output.surface.is_some() {
            backend.destroy_lock_surface(id);
        }
        backend.release_output(id);
    }
}
