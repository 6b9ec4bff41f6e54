// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::collections::BTreeMap;

use crate::event::Subpixel;

/// An output, identified by its registry global name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

impl core::fmt::Display for OutputId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// The lock surface covering one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSurface {
    /// Output this surface covers.
    pub output: OutputId,
    /// Width from the last configure.
    pub width: u32,
    /// Height from the last configure.
    pub height: u32,
    /// A configure has been received and acknowledged.
    pub configured: bool,
    /// Needs to be redrawn.
    pub dirty: bool,
    /// Created with an opaque region.
    pub opaque: bool,
    /// Serial of the last acknowledged configure.
    pub last_acked: Option<u32>,
}

impl LockSurface {
    fn new(output: OutputId, opaque: bool) -> Self {
        Self {
            output,
            width: 0,
            height: 0,
            configured: false,
            dirty: false,
            opaque,
            last_acked: None,
        }
    }
}

/// What the compositor told us about one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Connector name, once announced.
    pub name: Option<String>,
    /// Integer buffer scale.
    pub scale: i32,
    /// Subpixel layout.
    pub subpixel: Subpixel,
    /// The first `done` was received.
    pub described: bool,
    /// The lock surface, once created.
    pub surface: Option<LockSurface>,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            name: None,
            scale: 1,
            subpixel: Subpixel::Unknown,
            described: false,
            surface: None,
        }
    }
}

/// A surface due for a redraw, with everything needed to size its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Output the surface covers.
    pub output: OutputId,
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Buffer scale.
    pub scale: i32,
    /// Whether the surface was created opaque.
    pub opaque: bool,
}

/// Outputs keyed by [`OutputId`].
#[derive(Debug, Default)]
pub struct OutputRegistry {
    outputs: BTreeMap<OutputId, Output>,
}

impl OutputRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// No outputs known.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Looks up an output.
    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    /// Output ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.outputs.keys().copied()
    }

    /// Every existing lock surface.
    pub fn surfaces(&self) -> impl Iterator<Item = &LockSurface> {
        self.outputs.values().filter_map(|output| output.surface.as_ref())
    }

    /// Registers a pending output. Returns `false` if it was already known.
    pub fn add(&mut self, id: OutputId) -> bool {
        if self.outputs.contains_key(&id) {
            return false;
        }

        self.outputs.insert(id, Output::default());
        true
    }

    /// Marks `id` as described. Returns `true` only on the first `done`.
    pub fn mark_done(&mut self, id: OutputId) -> bool {
        match self.outputs.get_mut(&id) {
            Some(output) if !output.described => {
                output.described = true;
                true
            }
            _ => false,
        }
    }

    /// Forgets `id`, returning what was known about it.
    pub fn remove(&mut self, id: OutputId) -> Option<Output> {
        self.outputs.remove(&id)
    }

    /// Updates the scale. Returns `false` for an unknown output.
    pub fn set_scale(&mut self, id: OutputId, scale: i32) -> bool {
        self.update(id, |output| output.scale = scale)
    }

    /// Updates the subpixel layout. Returns `false` for an unknown output.
    pub fn set_subpixel(&mut self, id: OutputId, subpixel: Subpixel) -> bool {
        self.update(id, |output| output.subpixel = subpixel)
    }

    /// Records the connector name. Returns `false` for an unknown output.
    pub fn set_name(&mut self, id: OutputId, name: String) -> bool {
        self.update(id, |output| output.name = Some(name))
    }

    /// Gives a described output its lock surface.
    ///
    /// Returns `true` if a surface was attached, `false` if the output is
    /// unknown, not yet described, or already has one.
    pub fn attach_surface(&mut self, id: OutputId, opaque: bool) -> bool {
        match self.outputs.get_mut(&id) {
            Some(output) if output.described && output.surface.is_none() => {
                output.surface = Some(LockSurface::new(id, opaque));
                true
            }
            _ => false,
        }
    }

    /// Takes the lock surface away from `id`.
    pub fn detach_surface(&mut self, id: OutputId) -> Option<LockSurface> {
        self.outputs.get_mut(&id).and_then(|output| output.surface.take())
    }

    /// Described outputs that have no lock surface yet.
    pub fn awaiting_surface(&self) -> Vec<OutputId> {
        self.outputs
            .iter()
            .filter(|(_, output)| output.described && output.surface.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Records a configure and returns the serial to acknowledge.
    ///
    /// `None` when `id` is unknown or has no lock surface; nothing may be
    /// acknowledged then.
    pub fn configure(&mut self, id: OutputId, serial: u32, width: u32, height: u32) -> Option<u32> {
        let surface = self.outputs.get_mut(&id)?.surface.as_mut()?;

        surface.width = width;
        surface.height = height;
        surface.configured = true;
        surface.dirty = true;
        surface.last_acked = Some(serial);

        Some(serial)
    }

    /// Marks every lock surface dirty.
    pub fn mark_all_dirty(&mut self) {
        for surface in self.outputs.values_mut().filter_map(|o| o.surface.as_mut()) {
            surface.dirty = true;
        }
    }

    /// Returns configured surfaces that need a redraw and clears their
    /// dirty flag. Unconfigured surfaces stay dirty.
    pub fn take_dirty(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();

        for (id, output) in self.outputs.iter_mut() {
            let Some(surface) = output.surface.as_mut() else {
                continue;
            };
            if !surface.dirty || !surface.configured {
                continue;
            }

            surface.dirty = false;
            frames.push(Frame {
                output: *id,
                width: surface.width,
                height: surface.height,
                scale: output.scale,
                opaque: surface.opaque,
            });
        }

        frames
    }

    fn update<F: FnOnce(&mut Output)>(&mut self, id: OutputId, f: F) -> bool {
        let Some(output) = self.outputs.get_mut(&id) else {
            return false;
        };

        f(output);
        if let Some(surface) = output.surface.as_mut() {
            surface.dirty = true;
        }

        true
    }
}
