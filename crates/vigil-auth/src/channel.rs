// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use vigil_buffer::SecretBuffer;

use crate::checker::{CredentialChecker, serve};
use crate::error::AuthError;
use crate::wire::{FLAG_IGNORE_EMPTY, MAX_FRAME_LEN, RequestHeader, Verdict};

/// Where the parent end of the channel stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No request in flight.
    Idle,
    /// A request was written; its verdict has not arrived.
    AwaitingVerdict,
    /// The checker is gone or spoke out of turn. Terminal.
    Broken,
}

/// Outcome of [`AuthChannel::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The frame is on the wire; wait for [`AuthChannel::poll_reply`].
    Sent,
    /// Decided locally without contacting the checker.
    Decided(Verdict),
}

/// Outcome of [`AuthChannel::poll_reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to read yet.
    Pending,
    /// The checker answered.
    Verdict(Verdict),
}

/// Parent end of the privilege-separated checker channel.
pub struct AuthChannel {
    stream: UnixStream,
    state: ChannelState,
    child: Option<libc::pid_t>,
}

impl AuthChannel {
    /// Forks a checker subprocess.
    ///
    /// `make_checker` runs in the child, so anything it reads (the password
    /// hash) never exists in the parent. Call this before dropping
    /// privileges.
    pub fn spawn<F, C>(make_checker: F) -> Result<Self, AuthError>
    where
        F: FnOnce() -> Result<C, AuthError>,
        C: CredentialChecker,
    {
        let (parent_end, child_end) = UnixStream::pair().map_err(AuthError::Spawn)?;

        // SAFETY: the child only touches its own stream, the checker and
        // mmap'd secret storage before calling _exit.
        match unsafe { libc::fork() } {
            -1 => Err(AuthError::Spawn(io::Error::last_os_error())),
            0 => {
                drop(parent_end);
                let code = run_checker(child_end, make_checker);
                // SAFETY: terminating the forked child without running the
                // parent's atexit handlers.
                unsafe { libc::_exit(code) }
            }
            pid => {
                drop(child_end);
                log::debug!("password checker running as pid {}", pid);

                let mut channel = Self::from_stream(parent_end)?;
                channel.child = Some(pid);

                Ok(channel)
            }
        }
    }

    /// Attaches to a checker already listening on the other end of `stream`.
    ///
    /// The send buffer is raised to hold a full frame if needed.
    pub fn from_stream(stream: UnixStream) -> Result<Self, AuthError> {
        stream.set_nonblocking(true)?;
        ensure_send_buffer(stream.as_raw_fd(), MAX_FRAME_LEN)?;

        Ok(Self {
            stream,
            state: ChannelState::Idle,
            child: None,
        })
    }

    /// Current channel state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Size of the kernel send buffer in bytes.
    pub fn send_buffer_len(&self) -> io::Result<usize> {
        send_buffer_len(self.raw_fd())
    }

    /// Descriptor to watch for readability.
    pub fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Sends `secret` to the checker.
    ///
    /// The caller keeps ownership of the buffer and should clear it once
    /// this returns.
    pub fn submit(
        &mut self,
        secret: &SecretBuffer,
        ignore_empty: bool,
    ) -> Result<Submission, AuthError> {
        match self.state {
            ChannelState::Broken => return Err(AuthError::ChannelBroken),
            ChannelState::AwaitingVerdict => {
                log::error!("password submitted while a check is in progress");
                return Err(AuthError::RequestOutstanding);
            }
            ChannelState::Idle => {}
        }

        if ignore_empty && secret.is_empty() {
            log::debug!("ignoring empty password");
            return Ok(Submission::Decided(Verdict::Failure));
        }

        let header = RequestHeader {
            len: secret.len(),
            flags: if ignore_empty { FLAG_IGNORE_EMPTY } else { 0 },
        }
        .encode()?;

        self.write_all(&header)?;
        self.write_all(secret.as_bytes())?;

        self.state = ChannelState::AwaitingVerdict;

        Ok(Submission::Sent)
    }

    /// Reads the verdict if one is available. Never blocks.
    pub fn poll_reply(&mut self) -> Result<Reply, AuthError> {
        if self.state == ChannelState::Broken {
            return Err(AuthError::ChannelBroken);
        }

        let mut byte = [0u8; 1];

        match self.stream.read(&mut byte) {
            Ok(0) => return Err(self.peer_gone()),
            // Peer closed with our request still unread.
            Err(e) if e.kind() == ErrorKind::ConnectionReset => return Err(self.peer_gone()),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                return Ok(Reply::Pending);
            }
            Err(e) => {
                self.state = ChannelState::Broken;
                return Err(AuthError::Io(e));
            }
        }

        if self.state != ChannelState::AwaitingVerdict {
            log::error!("unsolicited verdict from password checker");
            self.state = ChannelState::Broken;
            return Err(AuthError::MalformedVerdict(byte[0]));
        }

        match Verdict::from_byte(byte[0]) {
            Ok(verdict) => {
                self.state = ChannelState::Idle;
                Ok(Reply::Verdict(verdict))
            }
            Err(e) => {
                self.state = ChannelState::Broken;
                Err(e)
            }
        }
    }

    fn peer_gone(&mut self) -> AuthError {
        log::error!("password checking subprocess exited");
        self.state = ChannelState::Broken;
        AuthError::ChannelBroken
    }

    /// Writes `bytes`, waiting for `POLLOUT` on a full buffer.
    ///
    /// A request is only sent once the previous verdict arrived, so the
    /// checker has drained the socket and the whole frame fits the send
    /// buffer sized in [`from_stream`](Self::from_stream). The wait is a
    /// fallback that does not trigger in practice.
    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), AuthError> {
        while !bytes.is_empty() {
            match self.stream.write(bytes) {
                Ok(0) => {
                    self.state = ChannelState::Broken;
                    return Err(AuthError::ChannelBroken);
                }
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if let Err(e) = wait_writable(self.raw_fd()) {
                        self.state = ChannelState::Broken;
                        return Err(e.into());
                    }
                }
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    log::error!("password checking subprocess exited");
                    self.state = ChannelState::Broken;
                    return Err(AuthError::ChannelBroken);
                }
                Err(e) => {
                    self.state = ChannelState::Broken;
                    return Err(AuthError::Io(e));
                }
            }
        }

        Ok(())
    }
}

impl Drop for AuthChannel {
    fn drop(&mut self) {
        if let Some(pid) = self.child.take() {
            // SAFETY: reaping our own child; WNOHANG never blocks.
            unsafe {
                libc::waitpid(pid, core::ptr::null_mut(), libc::WNOHANG);
            }
        }
    }
}

impl core::fmt::Debug for AuthChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthChannel")
            .field("fd", &self.raw_fd())
            .field("state", &self.state)
            .field("child", &self.child)
            .finish()
    }
}

fn wait_writable(fd: RawFd) -> io::Result<()> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };

    loop {
        // SAFETY: one valid pollfd, count matches.
        let rc = unsafe { libc::poll(&mut pfd, 1, -1) };

        if rc >= 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn run_checker<F, C>(mut stream: UnixStream, make_checker: F) -> i32
where
    F: FnOnce() -> Result<C, AuthError>,
    C: CredentialChecker,
{
    let mut checker = match make_checker() {
        Ok(checker) => checker,
        Err(e) => {
            log::error!("password checker setup failed: {}", e);
            return 1;
        }
    };

    match serve(&mut stream, &mut checker) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("password checker stopped: {}", e);
            1
        }
    }
}

fn send_buffer_len(fd: RawFd) -> io::Result<usize> {
    let mut value: libc::c_int = 0;
    let mut len = core::mem::size_of::<libc::c_int>() as libc::socklen_t;

    // SAFETY: value and len describe a valid c_int out-parameter.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            (&mut value as *mut libc::c_int).cast(),
            &mut len,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(usize::try_from(value).unwrap_or(0))
}

fn ensure_send_buffer(fd: RawFd, min: usize) -> io::Result<()> {
    if send_buffer_len(fd)? >= min {
        return Ok(());
    }

    let value = libc::c_int::try_from(min).unwrap_or(libc::c_int::MAX);
    log::debug!("raising checker socket send buffer to {} bytes", value);

    // SAFETY: value is a valid c_int in-parameter.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            (&value as *const libc::c_int).cast(),
            core::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
