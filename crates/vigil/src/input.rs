// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Keyboard decoding through xkbcommon.

use std::io;
use std::os::fd::OwnedFd;

use xkbcommon::xkb;
use xkbcommon::xkb::keysyms;

use crate::locker::KeyAction;

// Evdev codes are offset by 8 in xkb.
const EVDEV_OFFSET: u32 = 8;

/// Keymap and modifier state for the seat's keyboard.
pub struct Keyboard {
    context: xkb::Context,
    state: Option<xkb::State>,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    /// A keyboard without a keymap; keys are ignored until one arrives.
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            state: None,
        }
    }

    /// Whether a keymap has been loaded.
    pub fn has_keymap(&self) -> bool {
        self.state.is_some()
    }

    /// Compiles the keymap sent with `wl_keyboard.keymap`.
    pub fn load_keymap(&mut self, fd: OwnedFd, size: u32) -> io::Result<()> {
        // SAFETY: the compositor hands us a read-only mapping of `size`
        // bytes holding a text keymap.
        let keymap = unsafe {
            xkb::Keymap::new_from_fd(
                &self.context,
                fd,
                size as usize,
                xkb::KEYMAP_FORMAT_TEXT_V1,
                xkb::KEYMAP_COMPILE_NO_FLAGS,
            )
        }?;

        let Some(keymap) = keymap else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "failed to compile keymap"));
        };

        self.state = Some(xkb::State::new(&keymap));
        Ok(())
    }

    /// Applies `wl_keyboard.modifiers`.
    pub fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        if let Some(state) = self.state.as_mut() {
            state.update_mask(depressed, latched, locked, 0, 0, group);
        }
    }

    /// Decodes a pressed evdev key.
    pub fn press(&self, key: u32) -> Option<KeyAction> {
        let state = self.state.as_ref()?;
        let keycode = xkb::Keycode::from(key + EVDEV_OFFSET);

        let keysym = state.key_get_one_sym(keycode).raw();
        let ctrl = state.mod_name_is_active(xkb::MOD_NAME_CTRL, xkb::STATE_MODS_EFFECTIVE);
        let codepoint = state.key_get_utf32(keycode);

        action_for(keysym, ctrl, codepoint)
    }
}

/// Maps a keysym, the Ctrl state and the produced code point to an action.
pub fn action_for(keysym: u32, ctrl: bool, codepoint: u32) -> Option<KeyAction> {
    match keysym {
        keysyms::KEY_Return | keysyms::KEY_KP_Enter => return Some(KeyAction::Submit),
        keysyms::KEY_BackSpace => return Some(KeyAction::Backspace),
        keysyms::KEY_Escape => return Some(KeyAction::Clear),
        keysyms::KEY_u | keysyms::KEY_U if ctrl => return Some(KeyAction::Clear),
        _ => {}
    }

    char::from_u32(codepoint)
        .filter(|ch| *ch != '\0' && !ch.is_control())
        .map(KeyAction::Char)
}

impl core::fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keyboard")
            .field("has_keymap", &self.has_keymap())
            .finish()
    }
}
