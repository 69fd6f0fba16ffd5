//! Local input → connection command conversion.
//!
//! Translates raw [`LocalKey`] / pointer / drop events from the window
//! surface into [`InputEvent`]s for the inbound queue. Input that has no
//! connection-level mapping produces no event.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::input::keys::{KeyId, LocalButton, LocalKey};
use crate::protocol::input::{InputEvent, KeyScancode, ModifierSet, MouseInput};

// ── ClipboardSource ──────────────────────────────────────────────

/// Read access to the local clipboard, used by the paste hot-combo.
pub trait ClipboardSource {
    /// Current clipboard text, if any.
    fn text(&mut self) -> Option<String>;
}

impl<F> ClipboardSource for F
where
    F: FnMut() -> Option<String>,
{
    fn text(&mut self) -> Option<String> {
        self()
    }
}

// ── Scancode shim ────────────────────────────────────────────────

/// Offset subtracted from native scancodes before they are forwarded.
///
/// X11 reports keycodes that are the hardware scancode plus 8, so Linux
/// builds default to 8. Other platforms report plain scancodes.
pub const fn platform_scancode_offset() -> u32 {
    if cfg!(target_os = "linux") { 8 } else { 0 }
}

/// Modifier set for an event on `key`, given the global modifier state.
///
/// A modifier key never reports itself: pressing Shift alone yields an
/// empty set.
pub fn effective_modifiers(key: KeyId, held: ModifierSet) -> ModifierSet {
    match key.modifier() {
        Some(own) => held.difference(own),
        None => held,
    }
}

// ── KeyEncoder ───────────────────────────────────────────────────

/// Stateful keyboard encoder.
///
/// The only state is the set of Control keys currently held, keyed by
/// native scancode so left and right Control are tracked apart. The
/// paste hot-combo (Control+V) needs it.
#[derive(Debug, Clone)]
pub struct KeyEncoder {
    scancode_offset: u32,
    controls_down: Vec<u32>,
}

impl KeyEncoder {
    /// Create an encoder with an explicit scancode offset.
    pub fn new(scancode_offset: u32) -> Self {
        Self {
            scancode_offset,
            controls_down: Vec::new(),
        }
    }

    /// The configured scancode offset.
    pub fn scancode_offset(&self) -> u32 {
        self.scancode_offset
    }

    /// Whether any Control key is currently held.
    pub fn control_held(&self) -> bool {
        !self.controls_down.is_empty()
    }

    /// Forget held keys. Releases that happen while the window is not
    /// focused never reach the encoder.
    pub fn release_all(&mut self) {
        if !self.controls_down.is_empty() {
            debug!("clearing {} held control key(s)", self.controls_down.len());
            self.controls_down.clear();
        }
    }

    /// Encode one key event.
    ///
    /// Returns the key as a [`KeyScancode`], preceded by a
    /// [`InputEvent::ClipboardText`] when the event is the V press of a
    /// Control+V combo and the clipboard has text. A scancode below the
    /// configured offset cannot be corrected and yields no key event.
    pub fn encode(&mut self, key: &LocalKey, clipboard: &mut dyn ClipboardSource) -> Vec<InputEvent> {
        let mut out = Vec::with_capacity(2);

        if key.key == KeyId::Control {
            if !key.pressed {
                self.controls_down.retain(|&code| code != key.native_scancode);
            } else if !self.controls_down.contains(&key.native_scancode) {
                self.controls_down.push(key.native_scancode);
            }
        }

        if key.pressed && key.key == KeyId::V && self.control_held() {
            match clipboard.text() {
                Some(text) => {
                    debug!("paste combo: offering {} bytes of clipboard text", text.len());
                    out.push(InputEvent::ClipboardText(text));
                }
                None => debug!("paste combo: local clipboard has no text"),
            }
        }

        let Some(scancode) = key.native_scancode.checked_sub(self.scancode_offset) else {
            trace!(
                "dropping key {:?}: scancode {} below offset {}",
                key.key, key.native_scancode, self.scancode_offset
            );
            return out;
        };
        let Ok(scancode) = u16::try_from(scancode) else {
            trace!("dropping key {:?}: scancode {scancode} out of range", key.key);
            return out;
        };

        let modifiers = effective_modifiers(key.key, key.modifiers);
        let mut event = if key.pressed {
            KeyScancode::press(scancode, modifiers)
        } else {
            KeyScancode::release(scancode, modifiers)
        };
        if let Some(vk) = key.key.extended_override() {
            event = event.with_virtual_key(vk);
        }

        out.push(InputEvent::KeyScancode(event));
        out
    }
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new(platform_scancode_offset())
    }
}

// ── MouseEncoder ─────────────────────────────────────────────────

/// Pointer encoder. Hover forwarding is fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct MouseEncoder {
    hover: bool,
}

impl MouseEncoder {
    pub fn new(hover: bool) -> Self {
        Self { hover }
    }

    /// Pointer movement. Emitted only with hover forwarding enabled, and
    /// always as released whatever buttons are held.
    pub fn encode_move(&self, x: i32, y: i32) -> Option<InputEvent> {
        if !self.hover {
            return None;
        }
        Some(InputEvent::Mouse(MouseInput::hover(x, y)))
    }

    /// Button press or release. Buttons outside the table are dropped.
    pub fn encode_button(&self, button: LocalButton, pressed: bool, x: i32, y: i32) -> Option<InputEvent> {
        let Some(remote) = button.to_remote() else {
            trace!("dropping unmapped mouse button {button:?}");
            return None;
        };
        let input = if pressed {
            MouseInput::press(x, y, remote)
        } else {
            MouseInput::release(x, y, remote)
        };
        Some(InputEvent::Mouse(input))
    }
}

// ── File drop ────────────────────────────────────────────────────

/// Translate dropped local files into a clipboard file list.
pub fn encode_drop(paths: Vec<PathBuf>) -> Option<InputEvent> {
    if paths.is_empty() {
        return None;
    }
    Some(InputEvent::ClipboardFileList(paths))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::input::{RemoteButton, VirtualKey};

    fn no_clipboard() -> Option<String> {
        None
    }

    fn only_key(events: Vec<InputEvent>) -> KeyScancode {
        assert_eq!(events.len(), 1, "expected one event, got {events:?}");
        match events.into_iter().next() {
            Some(InputEvent::KeyScancode(k)) => k,
            other => panic!("expected scancode event, got {other:?}"),
        }
    }

    #[test]
    fn shift_alone_does_not_report_itself() {
        let mut enc = KeyEncoder::new(0);
        let key = LocalKey::press(KeyId::Shift, 0x2A, ModifierSet::SHIFT);
        let k = only_key(enc.encode(&key, &mut no_clipboard));
        assert!(k.modifiers.is_empty());
    }

    #[test]
    fn other_modifiers_are_kept() {
        let mut enc = KeyEncoder::new(0);
        let held = ModifierSet::SHIFT | ModifierSet::CONTROL | ModifierSet::NUMLOCK;
        let k = only_key(enc.encode(&LocalKey::press(KeyId::Control, 0x1D, held), &mut no_clipboard));
        assert_eq!(k.modifiers, ModifierSet::SHIFT | ModifierSet::NUMLOCK);

        let k = only_key(enc.encode(&LocalKey::press(KeyId::Other(0x41), 0x1E, held), &mut no_clipboard));
        assert_eq!(k.modifiers, held);
    }

    #[test]
    fn scancode_offset_is_applied() {
        let mut enc = KeyEncoder::new(8);
        let k = only_key(enc.encode(
            &LocalKey::press(KeyId::Other(0x61), 38, ModifierSet::empty()),
            &mut no_clipboard,
        ));
        assert_eq!(k.scancode, 30);
        assert!(k.pressed);
    }

    #[test]
    fn scancode_below_offset_is_dropped() {
        let mut enc = KeyEncoder::new(8);
        let out = enc.encode(
            &LocalKey::press(KeyId::Other(0), 3, ModifierSet::empty()),
            &mut no_clipboard,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn extended_keys_get_virtual_key() {
        let mut enc = KeyEncoder::new(0);
        let k = only_key(enc.encode(
            &LocalKey::release(KeyId::Home, 0x47, ModifierSet::empty()),
            &mut no_clipboard,
        ));
        assert_eq!(k.virtual_key, Some(VirtualKey::Home));
        assert!(!k.pressed);
    }

    #[test]
    fn control_v_offers_clipboard_then_key() {
        let mut enc = KeyEncoder::new(0);
        let mut clip = || Some("hello".to_string());

        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        assert!(enc.control_held());

        let out = enc.encode(&LocalKey::press(KeyId::V, 0x2F, ModifierSet::CONTROL), &mut clip);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], InputEvent::ClipboardText("hello".into()));
        assert!(matches!(out[1], InputEvent::KeyScancode(k) if k.scancode == 0x2F));
    }

    #[test]
    fn v_without_control_is_plain_key() {
        let mut enc = KeyEncoder::new(0);
        let mut calls = 0;
        let mut clip = || {
            calls += 1;
            Some("x".to_string())
        };
        let out = enc.encode(&LocalKey::press(KeyId::V, 0x2F, ModifierSet::empty()), &mut clip);
        assert_eq!(out.len(), 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn paste_needs_control_still_held() {
        let mut enc = KeyEncoder::new(0);
        let mut clip = || Some("x".to_string());
        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        enc.encode(&LocalKey::release(KeyId::Control, 0x1D, ModifierSet::empty()), &mut clip);
        let out = enc.encode(&LocalKey::press(KeyId::V, 0x2F, ModifierSet::empty()), &mut clip);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn releasing_one_control_keeps_the_other_held() {
        let mut enc = KeyEncoder::new(0);
        let mut clip = || Some("x".to_string());
        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        enc.encode(&LocalKey::press(KeyId::Control, 0xE01D, ModifierSet::CONTROL), &mut clip);
        // Auto-repeat of a held key changes nothing.
        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        enc.encode(&LocalKey::release(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        assert!(enc.control_held());

        let out = enc.encode(&LocalKey::press(KeyId::V, 0x2F, ModifierSet::CONTROL), &mut clip);
        assert_eq!(out[0], InputEvent::ClipboardText("x".into()));

        enc.encode(&LocalKey::release(KeyId::Control, 0xE01D, ModifierSet::empty()), &mut clip);
        assert!(!enc.control_held());
    }

    #[test]
    fn release_all_clears_a_stuck_control() {
        let mut enc = KeyEncoder::new(0);
        let mut clip = || Some("x".to_string());
        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        enc.release_all();
        assert!(!enc.control_held());

        let out = enc.encode(&LocalKey::press(KeyId::V, 0x2F, ModifierSet::empty()), &mut clip);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], InputEvent::KeyScancode(_)));
    }

    #[test]
    fn v_release_does_not_paste() {
        let mut enc = KeyEncoder::new(0);
        let mut clip = || Some("x".to_string());
        enc.encode(&LocalKey::press(KeyId::Control, 0x1D, ModifierSet::CONTROL), &mut clip);
        let out = enc.encode(&LocalKey::release(KeyId::V, 0x2F, ModifierSet::CONTROL), &mut clip);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn hover_is_released_and_gated() {
        let on = MouseEncoder::new(true);
        assert_eq!(
            on.encode_move(10, 20),
            Some(InputEvent::Mouse(MouseInput {
                x: 10,
                y: 20,
                button: RemoteButton::Hover,
                pressed: false,
            }))
        );

        let off = MouseEncoder::new(false);
        assert_eq!(off.encode_move(10, 20), None);
    }

    #[test]
    fn buttons_map_through_table() {
        let enc = MouseEncoder::new(false);
        assert_eq!(
            enc.encode_button(LocalButton::Extra(2), true, 1, 2),
            Some(InputEvent::Mouse(MouseInput::press(1, 2, RemoteButton::Button6)))
        );
        assert_eq!(enc.encode_button(LocalButton::Extra(9), true, 1, 2), None);
    }

    #[test]
    fn drop_with_files() {
        assert_eq!(encode_drop(Vec::new()), None);
        let ev = encode_drop(vec![PathBuf::from("/tmp/a.txt")]);
        assert!(matches!(ev, Some(InputEvent::ClipboardFileList(ref p)) if p.len() == 1));
    }
}
