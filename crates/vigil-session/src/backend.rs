// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use crate::error::SessionError;
use crate::registry::OutputId;

/// Outbound requests issued by [`LockSession`](crate::LockSession).
///
/// Implementations own the protocol objects and map [`OutputId`]s to
/// them. Requests are queued; only [`roundtrip`](Self::roundtrip) waits
/// for the compositor.
pub trait LockBackend {
    /// `ext_session_lock_manager_v1.lock`.
    fn request_lock(&mut self);

    /// Creates a `wl_surface` and its lock surface on `output`.
    ///
    /// `opaque` asks for a full-surface opaque region.
    fn create_lock_surface(&mut self, output: OutputId, opaque: bool);

    /// `ext_session_lock_surface_v1.ack_configure`.
    fn ack_configure(&mut self, output: OutputId, serial: u32);

    /// Destroys the lock surface and its `wl_surface`.
    fn destroy_lock_surface(&mut self, output: OutputId);

    /// Releases the bound `wl_output`.
    fn release_output(&mut self, output: OutputId);

    /// `ext_session_lock_v1.unlock_and_destroy`.
    fn unlock_and_destroy(&mut self);

    /// Flushes and waits until the compositor processed every request.
    fn roundtrip(&mut self) -> Result<(), SessionError>;
}
