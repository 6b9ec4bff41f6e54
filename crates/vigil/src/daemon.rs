// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Connects to the compositor, takes the lock and runs until unlocked.

use std::collections::VecDeque;
use std::io;
use std::os::fd::AsRawFd;

use vigil_auth::AuthChannel;
use vigil_loop::{Dispatch, EventLoop, Readiness, SignalPipe};
use vigil_session::ServerEvent;
use wayland_client::protocol::wl_keyboard::WlKeyboard;
use wayland_client::{Connection, EventQueue};

use crate::config::Config;
use crate::daemonize;
use crate::input::Keyboard;
use crate::locker::{EXIT_UNLOCKED, Fatal, Locker};
use crate::render::Palette;
use crate::wayland::WaylandBackend;

/// State reachable from Wayland callbacks.
pub struct Daemon {
    pub(crate) locker: Locker<WaylandBackend>,
    pub(crate) keyboard: Keyboard,
    pub(crate) keyboard_proxy: Option<WlKeyboard>,
    pub(crate) events: VecDeque<ServerEvent>,
    palette: Palette,
    fatal: Option<Fatal>,
}

impl Daemon {
    fn new(locker: Locker<WaylandBackend>, palette: Palette) -> Self {
        Self {
            locker,
            keyboard: Keyboard::new(),
            keyboard_proxy: None,
            events: VecDeque::new(),
            palette,
            fatal: None,
        }
    }

    /// Records the first fatal error; later ones are only logged.
    fn fail(&mut self, error: Fatal) {
        if self.fatal.is_some() {
            log::debug!("ignoring follow-up error: {}", error);
            return;
        }
        self.fatal = Some(error);
    }

    fn failed(&self) -> bool {
        self.fatal.is_some()
    }

    /// Feeds queued protocol events to the session.
    fn process_events(&mut self) {
        while let Some(event) = self.events.pop_front() {
            if let Err(e) = self.locker.handle_event(event) {
                self.events.clear();
                self.fail(e);
                return;
            }
        }
    }

    pub(crate) fn on_key(&mut self, key: u32) {
        let Some(action) = self.keyboard.press(key) else {
            return;
        };
        if let Err(e) = self.locker.key(action) {
            self.fail(e);
        }
    }

    fn render(&mut self) {
        let session = self.locker.session();
        let state = session.auth_state();
        let failed_attempts = session.failed_attempts();
        let frames = self.locker.take_frames();

        for frame in frames {
            let output = frame.output;
            if let Err(e) = self.locker.backend().draw(frame, &self.palette, state, failed_attempts) {
                log::error!("Failed to draw on {}: {}", output, e);
            }
        }
    }
}

struct Runtime {
    daemon: Daemon,
    queue: EventQueue<Daemon>,
    signals: SignalPipe,
}

fn display_error(error: impl std::fmt::Display) -> Fatal {
    Fatal::Display(error.to_string())
}

fn on_display_ready(rt: &mut Runtime, readiness: Readiness) -> Dispatch {
    if let Some(guard) = rt.queue.prepare_read() {
        match guard.read() {
            Ok(_) => {}
            Err(wayland_client::backend::WaylandError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                rt.daemon.fail(display_error(e));
                return Dispatch::Remove;
            }
        }
    }

    if let Err(e) = rt.queue.dispatch_pending(&mut rt.daemon) {
        rt.daemon.fail(display_error(e));
        return Dispatch::Remove;
    }

    if let Err(e) = rt.daemon.locker.check_display(readiness) {
        rt.daemon.fail(e);
        return Dispatch::Remove;
    }

    Dispatch::Continue
}

fn on_auth_ready(rt: &mut Runtime) -> Dispatch {
    match rt.daemon.locker.on_auth_ready() {
        Ok(()) => Dispatch::Continue,
        Err(e) => {
            rt.daemon.fail(e);
            Dispatch::Remove
        }
    }
}

fn on_signal(rt: &mut Runtime) -> Dispatch {
    if let Err(e) = rt.daemon.locker.on_unlock_signal(&rt.signals) {
        rt.daemon.fail(e);
    }

    Dispatch::Continue
}

fn flush(conn: &Connection) -> Result<(), Fatal> {
    match conn.flush() {
        Ok(()) => Ok(()),
        Err(wayland_client::backend::WaylandError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
        Err(e) => Err(display_error(e)),
    }
}

/// Locks the session and serves password attempts.
///
/// Returns the exit status of a normal unlock; every other way out is a
/// [`Fatal`] carrying its own status.
pub fn run(config: &Config, auth: AuthChannel) -> Result<i32, Fatal> {
    let conn = Connection::connect_to_env().map_err(display_error)?;
    let mut queue: EventQueue<Daemon> = conn.new_event_queue();
    let qh = queue.handle();
    let _registry = conn.display().get_registry(&qh, ());

    let backend = WaylandBackend::new(conn.clone(), qh);
    let locker = Locker::new(backend, auth, config.background_is_opaque(), config.ignore_empty)?;
    let mut daemon = Daemon::new(locker, Palette::from(config));

    // Globals, then the output and seat events they trigger.
    for _ in 0..2 {
        queue.roundtrip(&mut daemon).map_err(display_error)?;
        daemon.process_events();
        if let Some(fatal) = daemon.fatal.take() {
            return Err(fatal);
        }
    }

    daemon.locker.begin_lock()?;

    // Surfaces are painted as they get configured so the compositor
    // has content to show by the time it reports `locked`.
    while !daemon.locker.session().locked() {
        queue.blocking_dispatch(&mut daemon).map_err(display_error)?;
        daemon.process_events();
        if let Some(fatal) = daemon.fatal.take() {
            return Err(fatal);
        }
        daemon.render();
        flush(&conn)?;
    }

    log::debug!("session locked");

    if let Some(fd) = config.ready_fd {
        daemonize::send_ready(fd).map_err(Fatal::Readiness)?;
    }

    if config.daemonize {
        daemonize::daemonize().map_err(Fatal::Daemonize)?;
    }

    let signals = SignalPipe::install(libc::SIGUSR1)?;
    let signal_fd = signals.raw_fd();
    let auth_fd = daemon.locker.auth_fd();
    let display_fd = conn.backend().poll_fd().as_raw_fd();

    let mut event_loop: EventLoop<Runtime> = EventLoop::new();
    event_loop.register(display_fd, Readiness::READABLE, |rt: &mut Runtime, _, readiness| {
        on_display_ready(rt, readiness)
    })?;
    event_loop.register(auth_fd, Readiness::READABLE, |rt: &mut Runtime, _, _| on_auth_ready(rt))?;
    event_loop.register(signal_fd, Readiness::READABLE, |rt: &mut Runtime, _, _| on_signal(rt))?;

    let mut rt = Runtime {
        daemon,
        queue,
        signals,
    };

    loop {
        if let Err(e) = rt.queue.dispatch_pending(&mut rt.daemon) {
            rt.daemon.fail(display_error(e));
        }
        rt.daemon.process_events();

        if rt.daemon.failed() || !rt.daemon.locker.running() {
            break;
        }

        rt.daemon.render();
        flush(&conn)?;

        rt.daemon
            .locker
            .rearm_idle_timer(&mut event_loop, |rt: &mut Runtime| rt.daemon.locker.auth_idle());

        event_loop.run_once(&mut rt, None)?;
    }

    match rt.daemon.fatal.take() {
        Some(fatal) => Err(fatal),
        None => Ok(EXIT_UNLOCKED),
    }
}
