// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Password entry and verdict handling on top of a [`LockSession`].

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use thiserror::Error;
use vigil_auth::{AuthChannel, AuthError, Reply, Submission, Verdict};
use vigil_buffer::{BufferError, SecretBuffer};
use vigil_loop::{EventLoop, LoopError, Readiness, SignalPipe, TimerId};
use vigil_session::{
    AUTH_IDLE_DELAY, AuthState, EXIT_FAILURE, EXIT_LOCK_DENIED, Flow, Frame, LockBackend,
    LockSession, ServerEvent, SessionError,
};

/// Exit status of a clean unlock.
pub const EXIT_UNLOCKED: i32 = 0;

/// Errors that end the process without unlocking.
#[derive(Debug, Error)]
pub enum Fatal {
    /// Lock protocol failure, including a denied lock.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The checker is gone or misbehaved.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The event loop failed.
    #[error(transparent)]
    Loop(#[from] LoopError),

    /// Secret storage could not be set up.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Connecting to or talking with the compositor failed.
    #[error("display: {0}")]
    Display(String),

    /// The readiness byte could not be written.
    #[error("Failed to send readiness notification: {0}")]
    Readiness(#[source] io::Error),

    /// Detaching from the terminal failed.
    #[error("Failed to daemonize: {0}")]
    Daemonize(#[source] io::Error),
}

impl Fatal {
    /// Process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Fatal::Session(e) => e.exit_code(),
            Fatal::Readiness(_) => EXIT_LOCK_DENIED,
            _ => EXIT_FAILURE,
        }
    }
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Append a character.
    Char(char),
    /// Delete the last character.
    Backspace,
    /// Drop the whole password.
    Clear,
    /// Send the password to the checker.
    Submit,
}

/// Session, password and checker channel.
///
/// Everything here is independent of the display connection; the backend
/// is the only link to it.
pub struct Locker<B> {
    backend: B,
    session: LockSession,
    password: SecretBuffer,
    auth: AuthChannel,
    ignore_empty: bool,
    running: bool,
    idle_requested: bool,
    idle_timer: Option<TimerId>,
}

impl<B: LockBackend> Locker<B> {
    /// Wires the pieces together.
    pub fn new(backend: B, auth: AuthChannel, opaque: bool, ignore_empty: bool) -> Result<Self, Fatal> {
        let password = SecretBuffer::new()?;
        if !password.is_memory_locked() {
            log::warn!("password buffer is not locked in memory");
        }

        Ok(Self {
            backend,
            session: LockSession::new(opaque),
            password,
            auth,
            ignore_empty,
            running: true,
            idle_requested: false,
            idle_timer: None,
        })
    }

    /// The lock session.
    pub fn session(&self) -> &LockSession {
        &self.session
    }

    /// The lock session, mutably.
    pub fn session_mut(&mut self) -> &mut LockSession {
        &mut self.session
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Length of the password typed so far.
    pub fn password_len(&self) -> usize {
        self.password.len()
    }

    /// Descriptor of the checker channel.
    pub fn auth_fd(&self) -> RawFd {
        self.auth.raw_fd()
    }

    /// `false` once unlocked.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Feeds one protocol event to the session.
    pub fn handle_event(&mut self, event: ServerEvent) -> Result<(), Fatal> {
        self.session.handle(&mut self.backend, event)?;
        Ok(())
    }

    /// Configured surfaces due for a redraw.
    ///
    /// Frames are handed out as soon as a surface is configured, before
    /// the compositor reports `locked`.
    pub fn take_frames(&mut self) -> Vec<Frame> {
        self.session.take_dirty()
    }

    /// Checks the readiness reported for the display descriptor.
    pub fn check_display(&self, readiness: Readiness) -> Result<(), Fatal> {
        if readiness.is_failure() {
            log::error!("compositor connection lost ({:?})", readiness);
            return Err(Fatal::Display("compositor connection lost".to_string()));
        }
        Ok(())
    }

    /// Requests the lock.
    pub fn begin_lock(&mut self) -> Result<(), Fatal> {
        self.session.begin_lock(&mut self.backend)?;
        Ok(())
    }

    /// Applies a key press.
    ///
    /// Ignored before the lock is granted and while a check is running.
    pub fn key(&mut self, action: KeyAction) -> Result<(), Fatal> {
        if !self.session.locked() || self.session.auth_state() == AuthState::Validating {
            return Ok(());
        }

        match action {
            KeyAction::Char(ch) => {
                if let Err(e) = self.password.push_char(ch) {
                    log::debug!("dropping key: {}", e);
                    return Ok(());
                }
                self.session.set_auth_state(AuthState::Input);
            }
            KeyAction::Backspace => {
                if self.password.is_empty() {
                    self.session.set_auth_state(AuthState::Cleared);
                    self.idle_requested = true;
                } else {
                    self.password.delete_last_char();
                    self.session.set_auth_state(AuthState::Backspace);
                }
            }
            KeyAction::Clear => {
                self.password.clear();
                self.session.set_auth_state(AuthState::Cleared);
                self.idle_requested = true;
            }
            KeyAction::Submit => return self.submit(),
        }

        Ok(())
    }

    fn submit(&mut self) -> Result<(), Fatal> {
        let submission = self.auth.submit(&self.password, self.ignore_empty);
        self.password.clear();

        match submission? {
            Submission::Sent => {
                self.session.set_auth_state(AuthState::Validating);
                Ok(())
            }
            Submission::Decided(verdict) => self.apply_verdict(verdict),
        }
    }

    /// Reads the checker's answer, if any.
    pub fn on_auth_ready(&mut self) -> Result<(), Fatal> {
        match self.auth.poll_reply() {
            Ok(Reply::Pending) => Ok(()),
            Ok(Reply::Verdict(verdict)) => self.apply_verdict(verdict),
            Err(AuthError::ChannelBroken) => {
                log::error!("Password checking subprocess crashed; exiting.");
                Err(AuthError::ChannelBroken.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn apply_verdict(&mut self, verdict: Verdict) -> Result<(), Fatal> {
        match self.session.apply_verdict(verdict) {
            Flow::Unlock => self.unlock(),
            Flow::Continue => {
                self.idle_requested = true;
                Ok(())
            }
        }
    }

    /// Releases the lock and stops the loop.
    pub fn unlock(&mut self) -> Result<(), Fatal> {
        self.password.clear();
        self.session.unlock(&mut self.backend)?;
        self.running = false;
        Ok(())
    }

    /// An unlock signal may have arrived on `signals`.
    ///
    /// A signal after the session was already released is ignored.
    pub fn on_unlock_signal(&mut self, signals: &SignalPipe) -> Result<(), Fatal> {
        if signals.drain() == 0 {
            return Ok(());
        }

        if !self.running {
            log::debug!("ignoring signal {}: already unlocked", signals.signal());
            return Ok(());
        }

        log::debug!("unlock requested by signal {}", signals.signal());
        self.unlock()
    }

    /// Whether the auth-idle timer should be (re)armed. Resets the request.
    pub fn take_idle_request(&mut self) -> bool {
        core::mem::take(&mut self.idle_requested)
    }

    /// Arms the auth-idle timer on `event_loop` if one was requested,
    /// replacing any pending one. `on_idle` runs when it fires.
    pub fn rearm_idle_timer<C, F>(&mut self, event_loop: &mut EventLoop<C>, on_idle: F)
    where
        F: FnOnce(&mut C) + 'static,
    {
        self.rearm_idle_timer_after(event_loop, AUTH_IDLE_DELAY, on_idle);
    }

    pub(crate) fn rearm_idle_timer_after<C, F>(&mut self, event_loop: &mut EventLoop<C>, delay: Duration, on_idle: F)
    where
        F: FnOnce(&mut C) + 'static,
    {
        if !self.take_idle_request() {
            return;
        }

        if let Some(id) = self.idle_timer.take() {
            event_loop.cancel_timer(id);
        }
        self.idle_timer = Some(event_loop.add_timer(delay, on_idle));
    }

    /// The auth-idle timer fired.
    pub fn auth_idle(&mut self) {
        self.session.auth_idle();
    }
}

impl<B> core::fmt::Debug for Locker<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Locker")
            .field("session", &self.session)
            .field("password", &self.password)
            .field("auth", &self.auth)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}
