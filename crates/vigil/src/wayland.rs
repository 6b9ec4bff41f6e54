// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Wayland adapter.
//!
//! Protocol callbacks translate into [`ServerEvent`]s queued on the
//! [`Daemon`]; [`WaylandBackend`] carries out the session's requests.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::os::fd::{AsFd, FromRawFd, OwnedFd};

use wayland_client::protocol::{
    wl_buffer, wl_compositor, wl_keyboard, wl_output, wl_region, wl_registry, wl_seat, wl_shm,
    wl_shm_pool, wl_surface,
};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum, delegate_noop};
use wayland_protocols::ext::session_lock::v1::client::{
    ext_session_lock_manager_v1, ext_session_lock_surface_v1, ext_session_lock_v1,
};
use vigil_session::{
    AuthState, Frame, LockBackend, OutputId, ServerEvent, SessionError, Subpixel,
};

use crate::daemon::Daemon;
use crate::render::{self, Palette};

const COMPOSITOR_VERSION: u32 = 4;
const OUTPUT_VERSION: u32 = 4;
const SEAT_VERSION: u32 = 7;
// wl_output.release
const OUTPUT_RELEASE_SINCE: u32 = 3;

struct LockSurfaceHandle {
    surface: wl_surface::WlSurface,
    lock_surface: ext_session_lock_surface_v1::ExtSessionLockSurfaceV1,
}

/// Protocol objects, keyed the way the session keys them.
pub struct WaylandBackend {
    conn: Connection,
    qh: QueueHandle<Daemon>,
    compositor: Option<wl_compositor::WlCompositor>,
    shm: Option<wl_shm::WlShm>,
    lock_manager: Option<ext_session_lock_manager_v1::ExtSessionLockManagerV1>,
    lock: Option<ext_session_lock_v1::ExtSessionLockV1>,
    seats: BTreeMap<u32, wl_seat::WlSeat>,
    outputs: BTreeMap<OutputId, wl_output::WlOutput>,
    surfaces: BTreeMap<OutputId, LockSurfaceHandle>,
}

impl WaylandBackend {
    /// A backend with nothing bound yet.
    pub fn new(conn: Connection, qh: QueueHandle<Daemon>) -> Self {
        Self {
            conn,
            qh,
            compositor: None,
            shm: None,
            lock_manager: None,
            lock: None,
            seats: BTreeMap::new(),
            outputs: BTreeMap::new(),
            surfaces: BTreeMap::new(),
        }
    }

    fn bind_global(&mut self, registry: &wl_registry::WlRegistry, name: u32, interface: &str, version: u32) {
        let qh = &self.qh;

        match interface {
            "wl_compositor" => {
                self.compositor = Some(registry.bind(name, version.min(COMPOSITOR_VERSION), qh, ()));
            }
            "wl_shm" => {
                self.shm = Some(registry.bind(name, 1, qh, ()));
            }
            "wl_seat" => {
                self.seats.insert(name, registry.bind(name, version.min(SEAT_VERSION), qh, ()));
            }
            "wl_output" => {
                let output = registry.bind(name, version.min(OUTPUT_VERSION), qh, OutputId(name));
                self.outputs.insert(OutputId(name), output);
            }
            "ext_session_lock_manager_v1" => {
                self.lock_manager = Some(registry.bind(name, 1, qh, ()));
            }
            _ => {}
        }
    }

    fn remove_seat(&mut self, name: u32) {
        if let Some(seat) = self.seats.remove(&name) {
            if seat.version() >= 5 {
                seat.release();
            }
        }
    }

    /// Draws one frame onto the lock surface of `frame.output`.
    pub fn draw(&self, frame: Frame, palette: &Palette, state: AuthState, failed_attempts: u32) -> io::Result<()> {
        let (Some(handle), Some(shm)) = (self.surfaces.get(&frame.output), self.shm.as_ref()) else {
            return Ok(());
        };

        let scale = frame.scale.max(1);
        let Some(size) = render::buffer_size(frame.width, frame.height, scale as u32)? else {
            return Ok(());
        };

        let layers = render::layout(palette, state, failed_attempts, size.width, size.height, scale as u32);

        let file = shm_file(u64::from(size.len))?;
        let mut writer = BufWriter::new(&file);
        render::paint(&mut writer, size.width, size.height, palette.background, &layers)?;
        writer.flush()?;
        drop(writer);

        // buffer_size keeps every dimension within i32.
        let (width, height) = (size.width as i32, size.height as i32);

        let pool = shm.create_pool(file.as_fd(), size.len as i32, &self.qh, ());
        let buffer = pool.create_buffer(0, width, height, size.stride as i32, wl_shm::Format::Argb8888, &self.qh, ());
        pool.destroy();

        handle.surface.set_buffer_scale(scale);
        handle.surface.attach(Some(&buffer), 0, 0);
        handle.surface.damage_buffer(0, 0, width, height);
        handle.surface.commit();

        Ok(())
    }
}

fn shm_file(size: u64) -> io::Result<File> {
    // SAFETY: the name is a valid C string.
    let fd = unsafe { libc::memfd_create(c"vigil-shm".as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: memfd_create returned a fresh descriptor we own.
    let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
    file.set_len(size)?;

    Ok(file)
}

impl LockBackend for WaylandBackend {
    fn request_lock(&mut self) {
        if let Some(manager) = &self.lock_manager {
            self.lock = Some(manager.lock(&self.qh, ()));
        }
    }

    fn create_lock_surface(&mut self, output: OutputId, opaque: bool) {
        let (Some(compositor), Some(lock), Some(wl_output)) =
            (&self.compositor, &self.lock, self.outputs.get(&output))
        else {
            log::error!("cannot create lock surface for {}", output);
            return;
        };

        let surface = compositor.create_surface(&self.qh, ());
        let lock_surface = lock.get_lock_surface(&surface, wl_output, &self.qh, output);

        if opaque {
            let region = compositor.create_region(&self.qh, ());
            region.add(0, 0, i32::MAX, i32::MAX);
            surface.set_opaque_region(Some(&region));
            region.destroy();
        }

        self.surfaces.insert(output, LockSurfaceHandle { surface, lock_surface });
    }

    fn ack_configure(&mut self, output: OutputId, serial: u32) {
        if let Some(handle) = self.surfaces.get(&output) {
            handle.lock_surface.ack_configure(serial);
        }
    }

    fn destroy_lock_surface(&mut self, output: OutputId) {
        if let Some(handle) = self.surfaces.remove(&output) {
            handle.lock_surface.destroy();
            handle.surface.destroy();
        }
    }

    fn release_output(&mut self, output: OutputId) {
        if let Some(wl_output) = self.outputs.remove(&output) {
            if wl_output.version() >= OUTPUT_RELEASE_SINCE {
                wl_output.release();
            }
        }
    }

    fn unlock_and_destroy(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.unlock_and_destroy();
        }
    }

    fn roundtrip(&mut self) -> Result<(), SessionError> {
        self.conn
            .roundtrip()
            .map(|_| ())
            .map_err(|e| SessionError::Disconnected(e.to_string()))
    }
}

impl core::fmt::Debug for WaylandBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WaylandBackend")
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("surfaces", &self.surfaces.keys().collect::<Vec<_>>())
            .field("locked", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}

fn subpixel(value: WEnum<wl_output::Subpixel>) -> Subpixel {
    match value {
        WEnum::Value(wl_output::Subpixel::None) => Subpixel::None,
        WEnum::Value(wl_output::Subpixel::HorizontalRgb) => Subpixel::HorizontalRgb,
        WEnum::Value(wl_output::Subpixel::HorizontalBgr) => Subpixel::HorizontalBgr,
        WEnum::Value(wl_output::Subpixel::VerticalRgb) => Subpixel::VerticalRgb,
        WEnum::Value(wl_output::Subpixel::VerticalBgr) => Subpixel::VerticalBgr,
        _ => Subpixel::Unknown,
    }
}

// =============================================================================
// Event dispatch
// =============================================================================

impl Dispatch<wl_registry::WlRegistry, ()> for Daemon {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                state
                    .locker
                    .backend_mut()
                    .bind_global(registry, name, &interface, version);
                state.events.push_back(ServerEvent::GlobalAdded {
                    name,
                    interface,
                    version,
                });
            }
            wl_registry::Event::GlobalRemove { name } => {
                state.locker.backend_mut().remove_seat(name);
                state.events.push_back(ServerEvent::GlobalRemoved { name });
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_output::WlOutput, OutputId> for Daemon {
    fn event(
        state: &mut Self,
        _: &wl_output::WlOutput,
        event: wl_output::Event,
        output: &OutputId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let output = *output;

        let event = match event {
            wl_output::Event::Geometry { subpixel: value, .. } => ServerEvent::OutputGeometry {
                output,
                subpixel: subpixel(value),
            },
            wl_output::Event::Scale { factor } => ServerEvent::OutputScale { output, scale: factor },
            wl_output::Event::Name { name } => ServerEvent::OutputName { output, name },
            wl_output::Event::Done => ServerEvent::OutputDone { output },
            _ => return,
        };

        state.events.push_back(event);
    }
}

impl Dispatch<ext_session_lock_v1::ExtSessionLockV1, ()> for Daemon {
    fn event(
        state: &mut Self,
        _: &ext_session_lock_v1::ExtSessionLockV1,
        event: ext_session_lock_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            ext_session_lock_v1::Event::Locked => state.events.push_back(ServerEvent::Locked),
            ext_session_lock_v1::Event::Finished => state.events.push_back(ServerEvent::Finished),
            _ => {}
        }
    }
}

impl Dispatch<ext_session_lock_surface_v1::ExtSessionLockSurfaceV1, OutputId> for Daemon {
    fn event(
        state: &mut Self,
        _: &ext_session_lock_surface_v1::ExtSessionLockSurfaceV1,
        event: ext_session_lock_surface_v1::Event,
        output: &OutputId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let ext_session_lock_surface_v1::Event::Configure {
            serial,
            width,
            height,
        } = event
        {
            state.events.push_back(ServerEvent::SurfaceConfigure {
                output: *output,
                serial,
                width,
                height,
            });
        }
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for Daemon {
    fn event(
        state: &mut Self,
        seat: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(capabilities),
        } = event
        {
            if capabilities.contains(wl_seat::Capability::Keyboard) && state.keyboard_proxy.is_none() {
                state.keyboard_proxy = Some(seat.get_keyboard(qh, ()));
            }
        }
    }
}

impl Dispatch<wl_keyboard::WlKeyboard, ()> for Daemon {
    fn event(
        state: &mut Self,
        _: &wl_keyboard::WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format != WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) {
                    log::error!("Unknown keymap format {:?}, ignoring", format);
                    return;
                }
                if let Err(e) = state.keyboard.load_keymap(fd, size) {
                    log::error!("Failed to load keymap: {}", e);
                }
            }
            wl_keyboard::Event::Key {
                key,
                state: WEnum::Value(wl_keyboard::KeyState::Pressed),
                ..
            } => state.on_key(key),
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => state
                .keyboard
                .update_modifiers(mods_depressed, mods_latched, mods_locked, group),
            _ => {}
        }
    }
}

impl Dispatch<wl_buffer::WlBuffer, ()> for Daemon {
    fn event(
        _: &mut Self,
        buffer: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            buffer.destroy();
        }
    }
}

delegate_noop!(Daemon: wl_compositor::WlCompositor);
delegate_noop!(Daemon: wl_region::WlRegion);
delegate_noop!(Daemon: wl_shm_pool::WlShmPool);
delegate_noop!(Daemon: ignore wl_shm::WlShm);
delegate_noop!(Daemon: ignore wl_surface::WlSurface);
delegate_noop!(Daemon: ext_session_lock_manager_v1::ExtSessionLockManagerV1);
