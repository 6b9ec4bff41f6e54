// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use crate::registry::OutputId;

/// Subpixel layout reported by `wl_output.geometry`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Subpixel {
    /// Not reported.
    #[default]
    Unknown,
    /// No geometry.
    None,
    /// Horizontal RGB.
    HorizontalRgb,
    /// Horizontal BGR.
    HorizontalBgr,
    /// Vertical RGB.
    VerticalRgb,
    /// Vertical BGR.
    VerticalBgr,
}

/// Inbound protocol events the state machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `wl_registry.global`.
    GlobalAdded {
        /// Registry name.
        name: u32,
        /// Interface name, e.g. `wl_output`.
        interface: String,
        /// Advertised version.
        version: u32,
    },
    /// `wl_registry.global_remove`.
    GlobalRemoved {
        /// Registry name.
        name: u32,
    },
    /// `wl_output.geometry`.
    OutputGeometry {
        /// Output.
        output: OutputId,
        /// Subpixel layout.
        subpixel: Subpixel,
    },
    /// `wl_output.scale`.
    OutputScale {
        /// Output.
        output: OutputId,
        /// Integer scale factor.
        scale: i32,
    },
    /// `wl_output.name`.
    OutputName {
        /// Output.
        output: OutputId,
        /// Connector name.
        name: String,
    },
    /// `wl_output.done`.
    OutputDone {
        /// Output.
        output: OutputId,
    },
    /// `ext_session_lock_v1.locked`.
    Locked,
    /// `ext_session_lock_v1.finished`.
    Finished,
    /// `ext_session_lock_surface_v1.configure`.
    SurfaceConfigure {
        /// Output the surface belongs to.
        output: OutputId,
        /// Serial to acknowledge.
        serial: u32,
        /// Proposed width.
        width: u32,
        /// Proposed height.
        height: u32,
    },
}
