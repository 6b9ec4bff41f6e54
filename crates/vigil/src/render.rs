// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Software rendering into `wl_shm` buffers.
//!
//! A frame is the background colour with, on top, a centred square in the
//! colour of the current [`AuthState`] and a row of marks for failed
//! attempts.

use std::io::{self, Write};

use vigil_session::AuthState;

use crate::config::Config;

/// Bytes per ARGB8888 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

const MARK_SIZE: u32 = 8;
const MARK_GAP: u32 = 6;
const MAX_MARKS: u32 = 10;

/// Colours and sizes taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Background, `0xRRGGBBAA`.
    pub background: u32,
    /// Indicator while typing.
    pub input: u32,
    /// Indicator after clearing.
    pub cleared: u32,
    /// Indicator while verifying.
    pub verifying: u32,
    /// Indicator after a rejection.
    pub wrong: u32,
    /// Indicator edge in logical pixels.
    pub indicator_size: u32,
    /// Draw failed-attempt marks.
    pub show_failed_attempts: bool,
}

impl From<&Config> for Palette {
    fn from(config: &Config) -> Self {
        Self {
            background: config.color,
            input: config.input_color,
            cleared: config.cleared_color,
            verifying: config.verifying_color,
            wrong: config.wrong_color,
            indicator_size: config.indicator_size,
            show_failed_attempts: config.show_failed_attempts,
        }
    }
}

impl Palette {
    /// Indicator colour for `state`; `None` hides the indicator.
    pub fn indicator(&self, state: AuthState) -> Option<u32> {
        match state {
            AuthState::Idle => None,
            AuthState::Input | AuthState::Backspace => Some(self.input),
            AuthState::Cleared => Some(self.cleared),
            AuthState::Validating => Some(self.verifying),
            AuthState::Invalid => Some(self.wrong),
        }
    }
}

/// Axis-aligned rectangle in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Pixel value, already converted.
    pub pixel: u32,
}

impl Rect {
    fn spans_row(&self, y: u32) -> bool {
        y >= self.y && y < self.y.saturating_add(self.height)
    }
}

/// Pixel geometry of one shm buffer. Every field fits an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    /// Width in buffer pixels.
    pub width: u32,
    /// Height in buffer pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Total bytes.
    pub len: u32,
}

/// Geometry of the buffer for a `width × height` surface at `scale`.
///
/// `Ok(None)` for an empty surface. Sizes the wire format cannot carry
/// are an error.
pub fn buffer_size(width: u32, height: u32, scale: u32) -> io::Result<Option<BufferSize>> {
    let too_large = || io::Error::new(io::ErrorKind::InvalidInput, "surface too large");
    let fits = |value: u32| i32::try_from(value).is_ok();

    let width = width.checked_mul(scale).ok_or_else(too_large)?;
    let height = height.checked_mul(scale).ok_or_else(too_large)?;
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let stride = width.checked_mul(BYTES_PER_PIXEL as u32).ok_or_else(too_large)?;
    let len = stride.checked_mul(height).ok_or_else(too_large)?;
    if !(fits(width) && fits(height) && fits(stride) && fits(len)) {
        return Err(too_large());
    }

    Ok(Some(BufferSize {
        width,
        height,
        stride,
        len,
    }))
}

/// Converts `0xRRGGBBAA` to premultiplied ARGB8888.
pub fn to_argb_premultiplied(rgba: u32) -> u32 {
    let a = rgba & 0xFF;
    let premultiply = |channel: u32| (channel * a + 127) / 255;

    let r = premultiply((rgba >> 24) & 0xFF);
    let g = premultiply((rgba >> 16) & 0xFF);
    let b = premultiply((rgba >> 8) & 0xFF);

    (a << 24) | (r << 16) | (g << 8) | b
}

/// Blends premultiplied `src` over premultiplied `dst`.
fn over(src: u32, dst: u32) -> u32 {
    let sa = src >> 24;
    let blend = |shift: u32| {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        (s + (d * (255 - sa) + 127) / 255).min(255)
    };

    (blend(24) << 24) | (blend(16) << 16) | (blend(8) << 8) | blend(0)
}

/// Layers for a `width × height` buffer at `scale`.
pub fn layout(
    palette: &Palette,
    state: AuthState,
    failed_attempts: u32,
    width: u32,
    height: u32,
    scale: u32,
) -> Vec<Rect> {
    let mut layers = Vec::new();
    let background = to_argb_premultiplied(palette.background);

    let size = palette.indicator_size.saturating_mul(scale).min(width).min(height);
    let top = (height - size) / 2;

    if let Some(color) = palette.indicator(state) {
        layers.push(Rect {
            x: (width - size) / 2,
            y: top,
            width: size,
            height: size,
            pixel: over(to_argb_premultiplied(color), background),
        });
    }

    if palette.show_failed_attempts && failed_attempts > 0 {
        let marks = failed_attempts.min(MAX_MARKS);
        let mark = MARK_SIZE * scale;
        let gap = MARK_GAP * scale;
        let row_width = marks * mark + (marks - 1) * gap;
        let y = top + size + gap;

        if row_width <= width && y + mark <= height {
            let left = (width - row_width) / 2;
            let pixel = over(to_argb_premultiplied(palette.wrong), background);

            for i in 0..marks {
                layers.push(Rect {
                    x: left + i * (mark + gap),
                    y,
                    width: mark,
                    height: mark,
                    pixel,
                });
            }
        }
    }

    layers
}

/// Writes `height` rows of ARGB8888 pixels to `out`.
pub fn paint<W: Write>(out: &mut W, width: u32, height: u32, background: u32, layers: &[Rect]) -> io::Result<()> {
    let background = to_argb_premultiplied(background).to_le_bytes();
    let row_len = width as usize * BYTES_PER_PIXEL;

    let mut plain = Vec::with_capacity(row_len);
    for _ in 0..width {
        plain.extend_from_slice(&background);
    }
    let mut row = plain.clone();

    for y in 0..height {
        let mut touched = false;

        for rect in layers.iter().filter(|rect| rect.spans_row(y)) {
            if !touched {
                row.copy_from_slice(&plain);
                touched = true;
            }

            let start = rect.x.min(width) as usize * BYTES_PER_PIXEL;
            let end = rect.x.saturating_add(rect.width).min(width) as usize * BYTES_PER_PIXEL;
            for pixel in row[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                pixel.copy_from_slice(&rect.pixel.to_le_bytes());
            }
        }

        out.write_all(if touched { &row } else { &plain })?;
    }

    Ok(())
}
