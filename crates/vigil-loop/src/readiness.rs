// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

bitflags::bitflags! {
    /// Interest passed to `register`, and readiness reported to callbacks.
    ///
    /// Only `READABLE` and `WRITABLE` are meaningful as interest; the
    /// other flags are always reported.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Readiness: u8 {
        /// Data can be read (`POLLIN`).
        const READABLE = 1 << 0;
        /// Data can be written (`POLLOUT`).
        const WRITABLE = 1 << 1;
        /// The peer hung up (`POLLHUP`).
        const HANGUP = 1 << 2;
        /// An error condition (`POLLERR`).
        const ERROR = 1 << 3;
        /// The descriptor is not open (`POLLNVAL`).
        const INVALID = 1 << 4;
    }
}

impl Readiness {
    pub(crate) fn to_poll_events(self) -> libc::c_short {
        let mut events = 0;

        if self.contains(Readiness::READABLE) {
            events |= libc::POLLIN;
        }
        if self.contains(Readiness::WRITABLE) {
            events |= libc::POLLOUT;
        }

        events
    }

    pub(crate) fn from_revents(revents: libc::c_short) -> Self {
        let mut readiness = Readiness::empty();

        if revents & libc::POLLIN != 0 {
            readiness |= Readiness::READABLE;
        }
        if revents & libc::POLLOUT != 0 {
            readiness |= Readiness::WRITABLE;
        }
        if revents & libc::POLLHUP != 0 {
            readiness |= Readiness::HANGUP;
        }
        if revents & libc::POLLERR != 0 {
            readiness |= Readiness::ERROR;
        }
        if revents & libc::POLLNVAL != 0 {
            readiness |= Readiness::INVALID;
        }

        readiness
    }

    /// `HANGUP`, `ERROR` or `INVALID`.
    pub fn is_failure(self) -> bool {
        self.intersects(Readiness::HANGUP | Readiness::ERROR | Readiness::INVALID)
    }
}
