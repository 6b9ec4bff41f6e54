// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::collections::BTreeMap;
use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use crate::error::LoopError;
use crate::readiness::Readiness;

/// What to do with a descriptor after its callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep watching.
    Continue,
    /// Unregister.
    Remove,
}

/// Handle for cancelling a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

type FdCallback<C> = Box<dyn FnMut(&mut C, RawFd, Readiness) -> Dispatch>;
type TimerCallback<C> = Box<dyn FnOnce(&mut C)>;

struct Source<C> {
    fd: RawFd,
    interest: Readiness,
    callback: FdCallback<C>,
}

/// Single-threaded `poll(2)` loop over a context of type `C`.
///
/// Callbacks never see the loop itself, so registration changes happen
/// between iterations, or through [`Dispatch::Remove`].
pub struct EventLoop<C> {
    sources: Vec<Source<C>>,
    timers: BTreeMap<(Instant, TimerId), TimerCallback<C>>,
    next_timer: u64,
}

impl<C> Default for EventLoop<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventLoop<C> {
    /// Creates an empty loop.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            timers: BTreeMap::new(),
            next_timer: 0,
        }
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// `true` if no descriptor is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether `fd` has a callback.
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.sources.iter().any(|source| source.fd == fd)
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Watches `fd` for `interest`.
    ///
    /// Descriptors are dispatched in registration order.
    pub fn register<F>(&mut self, fd: RawFd, interest: Readiness, callback: F) -> Result<(), LoopError>
    where
        F: FnMut(&mut C, RawFd, Readiness) -> Dispatch + 'static,
    {
        if fd < 0 {
            return Err(LoopError::InvalidFd(fd));
        }
        if self.is_registered(fd) {
            return Err(LoopError::AlreadyRegistered(fd));
        }

        self.sources.push(Source {
            fd,
            interest,
            callback: Box::new(callback),
        });

        Ok(())
    }

    /// Stops watching `fd`. Returns `false` if it was not registered.
    pub fn unregister(&mut self, fd: RawFd) -> bool {
        let before = self.sources.len();
        self.sources.retain(|source| source.fd != fd);
        self.sources.len() != before
    }

    /// Runs `callback` once, no earlier than `delay` from now.
    pub fn add_timer<F>(&mut self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce(&mut C) + 'static,
    {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;

        self.timers.insert((Instant::now() + delay, id), Box::new(callback));

        id
    }

    /// Drops a pending timer. Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, timer)| *timer == id).copied();

        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Waits once and dispatches.
    ///
    /// Blocks for at most `timeout`, shortened to the nearest timer; with
    /// neither, blocks until a descriptor is ready. Every ready descriptor
    /// is dispatched once, then every expired timer. Returns the number of
    /// callbacks run. An interrupted wait is not an error.
    pub fn run_once(&mut self, ctx: &mut C, timeout: Option<Duration>) -> Result<usize, LoopError> {
        let mut pollfds: Vec<libc::pollfd> = self
            .sources
            .iter()
            .map(|source| libc::pollfd {
                fd: source.fd,
                events: source.interest.to_poll_events(),
                revents: 0,
            })
            .collect();

        let wait = self.wait_duration(timeout);

        // SAFETY: pollfds is a valid array of pollfds.len() entries.
        let rc = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                poll_timeout_ms(wait),
            )
        };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(LoopError::Poll(err));
            }
            log::trace!("poll interrupted");
            return Ok(self.run_expired_timers(ctx));
        }

        let mut dispatched = 0;

        if rc > 0 {
            let mut removed = Vec::new();

            for (source, pollfd) in self.sources.iter_mut().zip(&pollfds) {
                if pollfd.revents == 0 {
                    continue;
                }

                let readiness = Readiness::from_revents(pollfd.revents);
                dispatched += 1;

                if (source.callback)(ctx, source.fd, readiness) == Dispatch::Remove {
                    removed.push(source.fd);
                }
            }

            if !removed.is_empty() {
                self.sources.retain(|source| !removed.contains(&source.fd));
            }
        }

        Ok(dispatched + self.run_expired_timers(ctx))
    }

    fn wait_duration(&self, timeout: Option<Duration>) -> Option<Duration> {
        let now = Instant::now();
        let next_timer = self
            .timers
            .keys()
            .next()
            .map(|(deadline, _)| deadline.saturating_duration_since(now));

        match (timeout, next_timer) {
            (Some(timeout), Some(timer)) => Some(timeout.min(timer)),
            (timeout, timer) => timeout.or(timer),
        }
    }

    fn run_expired_timers(&mut self, ctx: &mut C) -> usize {
        let now = Instant::now();
        let mut ran = 0;

        while let Some(entry) = self.timers.first_entry() {
            if entry.key().0 > now {
                break;
            }

            let callback = entry.remove();
            callback(ctx);
            ran += 1;
        }

        ran
    }
}

// Rounds up so a timer is never polled for too short and spun on.
fn poll_timeout_ms(wait: Option<Duration>) -> libc::c_int {
    match wait {
        None => -1,
        Some(wait) => {
            let ms = wait.as_nanos().div_ceil(1_000_000);
            ms.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}

impl<C> core::fmt::Debug for EventLoop<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventLoop")
            .field("fds", &self.sources.iter().map(|s| s.fd).collect::<Vec<_>>())
            .field("timers", &self.timers.len())
            .finish()
    }
}
