// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Tests for EventLoop.

use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use crate::error::LoopError;
use crate::event_loop::{Dispatch, EventLoop};
use crate::readiness::Readiness;

use super::utils::{pipe, read_byte, write_byte};

#[derive(Default)]
struct Ctx {
    events: Vec<(i32, Readiness)>,
    fired: Vec<&'static str>,
}

// =============================================================================
// register() / unregister()
// =============================================================================

#[test]
fn test_register_rejects_negative_fd() {
    let mut event_loop = EventLoop::<Ctx>::new();

    let result = event_loop.register(-1, Readiness::READABLE, |_, _, _| Dispatch::Continue);
    assert!(matches!(result, Err(LoopError::InvalidFd(-1))));
}

#[test]
fn test_register_rejects_duplicates() {
    let (read, _write) = pipe();
    let mut event_loop = EventLoop::<Ctx>::new();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |_, _, _| Dispatch::Continue)
        .expect("Failed to register(..)");
    let result = event_loop.register(read.as_raw_fd(), Readiness::READABLE, |_, _, _| {
        Dispatch::Continue
    });

    assert!(matches!(result, Err(LoopError::AlreadyRegistered(_))));
    assert_eq!(event_loop.len(), 1);
}

#[test]
fn test_unregister() {
    let (read, _write) = pipe();
    let mut event_loop = EventLoop::<Ctx>::new();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |_, _, _| Dispatch::Continue)
        .expect("Failed to register(..)");

    assert!(event_loop.unregister(read.as_raw_fd()));
    assert!(!event_loop.unregister(read.as_raw_fd()));
    assert!(event_loop.is_empty());
}

// =============================================================================
// run_once(): descriptors
// =============================================================================

#[test]
fn test_timeout_with_nothing_ready_runs_nothing() {
    let (read, _write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Continue
        })
        .expect("Failed to register(..)");

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_millis(10)))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 0);
    assert!(ctx.events.is_empty());
}

#[test]
fn test_readable_fd_is_dispatched() {
    let (read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Continue
        })
        .expect("Failed to register(..)");

    write_byte(&write);

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_secs(5)))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 1);
    assert_eq!(ctx.events, vec![(read.as_raw_fd(), Readiness::READABLE)]);
}

#[test]
fn test_level_triggered_until_drained() {
    let (read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Continue
        })
        .expect("Failed to register(..)");

    write_byte(&write);

    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");
    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");
    assert_eq!(ctx.events.len(), 2);

    assert_eq!(read_byte(&read), Some(1));

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_millis(10)))
        .expect("Failed to run_once(..)");
    assert_eq!(ran, 0);
}

#[test]
fn test_writable_interest() {
    let (_read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(write.as_raw_fd(), Readiness::WRITABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Continue
        })
        .expect("Failed to register(..)");

    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");

    assert_eq!(ctx.events, vec![(write.as_raw_fd(), Readiness::WRITABLE)]);
}

#[test]
fn test_peer_close_reports_hangup() {
    let (read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Remove
        })
        .expect("Failed to register(..)");

    drop(write);

    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");

    assert_eq!(ctx.events.len(), 1);
    assert!(ctx.events[0].1.contains(Readiness::HANGUP));
    assert!(ctx.events[0].1.is_failure());
}

#[test]
fn test_remove_unregisters_after_callback() {
    let (read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
            ctx.events.push((fd, readiness));
            Dispatch::Remove
        })
        .expect("Failed to register(..)");

    write_byte(&write);

    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");
    assert!(!event_loop.is_registered(read.as_raw_fd()));

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_millis(10)))
        .expect("Failed to run_once(..)");
    assert_eq!(ran, 0);
    assert_eq!(ctx.events.len(), 1);
}

#[test]
fn test_every_ready_fd_dispatched_once_in_order() {
    let (read_a, write_a) = pipe();
    let (read_b, write_b) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    for fd in [read_a.as_raw_fd(), read_b.as_raw_fd()] {
        event_loop
            .register(fd, Readiness::READABLE, |ctx: &mut Ctx, fd, readiness| {
                ctx.events.push((fd, readiness));
                Dispatch::Continue
            })
            .expect("Failed to register(..)");
    }

    write_byte(&write_b);
    write_byte(&write_a);

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_secs(5)))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 2);
    assert_eq!(
        ctx.events.iter().map(|(fd, _)| *fd).collect::<Vec<_>>(),
        vec![read_a.as_raw_fd(), read_b.as_raw_fd()]
    );
}

// =============================================================================
// run_once(): timers
// =============================================================================

#[test]
fn test_timer_fires_after_delay() {
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    let start = Instant::now();
    event_loop.add_timer(Duration::from_millis(20), |ctx: &mut Ctx| ctx.fired.push("idle"));

    let ran = event_loop.run_once(&mut ctx, None).expect("Failed to run_once(..)");

    assert_eq!(ran, 1);
    assert_eq!(ctx.fired, vec!["idle"]);
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(event_loop.pending_timers(), 0);
}

#[test]
fn test_timeout_shorter_than_timer_does_not_fire() {
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop.add_timer(Duration::from_secs(60), |ctx: &mut Ctx| ctx.fired.push("late"));

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_millis(10)))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 0);
    assert!(ctx.fired.is_empty());
    assert_eq!(event_loop.pending_timers(), 1);
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop.add_timer(Duration::from_millis(10), |ctx: &mut Ctx| ctx.fired.push("second"));
    event_loop.add_timer(Duration::ZERO, |ctx: &mut Ctx| ctx.fired.push("first"));

    std::thread::sleep(Duration::from_millis(20));
    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::ZERO))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 2);
    assert_eq!(ctx.fired, vec!["first", "second"]);
}

#[test]
fn test_cancelled_timer_never_fires() {
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    let id = event_loop.add_timer(Duration::ZERO, |ctx: &mut Ctx| ctx.fired.push("cancelled"));
    assert!(event_loop.cancel_timer(id));
    assert!(!event_loop.cancel_timer(id));

    let ran = event_loop
        .run_once(&mut ctx, Some(Duration::from_millis(5)))
        .expect("Failed to run_once(..)");

    assert_eq!(ran, 0);
    assert!(ctx.fired.is_empty());
}

#[test]
fn test_fds_dispatch_before_timers() {
    let (read, write) = pipe();
    let mut event_loop = EventLoop::new();
    let mut ctx = Ctx::default();

    event_loop
        .register(read.as_raw_fd(), Readiness::READABLE, |ctx: &mut Ctx, _, _| {
            ctx.fired.push("fd");
            Dispatch::Remove
        })
        .expect("Failed to register(..)");
    event_loop.add_timer(Duration::ZERO, |ctx: &mut Ctx| ctx.fired.push("timer"));

    write_byte(&write);

    event_loop.run_once(&mut ctx, Some(Duration::from_secs(5))).expect("Failed to run_once(..)");

    assert_eq!(ctx.fired, vec!["fd", "timer"]);
}
