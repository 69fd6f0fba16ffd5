//! Connection-level input commands.
//!
//! These are the objects the connection's command queue accepts. Live
//! input (via the encoder) and the script injector both produce them;
//! the runtime bridge consumes each one exactly once.
//!
//! ```text
//! Shell ──[KeyScancode/Mouse/Clipboard*]──► inbound queue ──► bridge ──► commands
//! Script ─[KeyScancode/KeyUnicode]────────► inbound queue ──► bridge ──► commands
//! Shell ──[Shutdown]──────────────────────► inbound queue ──► bridge (pump exits)
//! ```

use std::path::PathBuf;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ── ModifierSet ──────────────────────────────────────────────────

bitflags! {
    /// Modifier keys held while a key event was produced.
    ///
    /// Never contains the modifier that the event itself toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModifierSet: u8 {
        const SHIFT = 0x01;
        const CONTROL = 0x02;
        const ALT = 0x04;
        const WIN = 0x08;
        const NUMLOCK = 0x10;
    }
}

// ── VirtualKey ───────────────────────────────────────────────────

/// Named virtual-key override sent alongside a raw scancode for keys
/// that share scancodes across layouts (navigation, keypad operators,
/// Windows/menu keys, pause and print-screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VirtualKey {
    End,
    Down,
    Next,
    Insert,
    Delete,
    Snapshot,
    Home,
    Up,
    Prior,
    Left,
    Right,
    LWin,
    Return,
    LMenu,
    Pause,
    Divide,
    Decimal,
}

impl VirtualKey {
    /// The Windows `VK_*` name.
    pub const fn name(self) -> &'static str {
        match self {
            VirtualKey::End => "VK_END",
            VirtualKey::Down => "VK_DOWN",
            VirtualKey::Next => "VK_NEXT",
            VirtualKey::Insert => "VK_INSERT",
            VirtualKey::Delete => "VK_DELETE",
            VirtualKey::Snapshot => "VK_SNAPSHOT",
            VirtualKey::Home => "VK_HOME",
            VirtualKey::Up => "VK_UP",
            VirtualKey::Prior => "VK_PRIOR",
            VirtualKey::Left => "VK_LEFT",
            VirtualKey::Right => "VK_RIGHT",
            VirtualKey::LWin => "VK_LWIN",
            VirtualKey::Return => "VK_RETURN",
            VirtualKey::LMenu => "VK_LMENU",
            VirtualKey::Pause => "VK_PAUSE",
            VirtualKey::Divide => "VK_DIVIDE",
            VirtualKey::Decimal => "VK_DECIMAL",
        }
    }
}

impl std::fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── RemoteButton ─────────────────────────────────────────────────

/// Connection-level mouse button codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteButton {
    /// Pointer movement without a button.
    Hover,
    Left,
    Right,
    Middle,
    Button5,
    Button6,
    Button7,
    Button8,
    Button9,
    Button10,
}

// ── Key Input ────────────────────────────────────────────────────

/// A physical key press or release, identified by scancode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyScancode {
    /// Set-1 scancode; extended keys carry `0xE0` in the high byte.
    pub scancode: u16,
    /// `true` on press, `false` on release.
    pub pressed: bool,
    /// Modifiers held at the time of the event.
    pub modifiers: ModifierSet,
    /// Optional virtual-key override for ambiguous keys.
    pub virtual_key: Option<VirtualKey>,
}

impl KeyScancode {
    pub fn press(scancode: u16, modifiers: ModifierSet) -> Self {
        Self {
            scancode,
            pressed: true,
            modifiers,
            virtual_key: None,
        }
    }

    pub fn release(scancode: u16, modifiers: ModifierSet) -> Self {
        Self {
            scancode,
            pressed: false,
            modifiers,
            virtual_key: None,
        }
    }

    pub fn with_virtual_key(mut self, vk: VirtualKey) -> Self {
        self.virtual_key = Some(vk);
        self
    }
}

/// A character typed directly, for dialects that take characters
/// instead of scancodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUnicode {
    pub ch: char,
    pub pressed: bool,
}

// ── Mouse Input ──────────────────────────────────────────────────

/// A pointer event in remote framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseInput {
    pub x: i32,
    pub y: i32,
    pub button: RemoteButton,
    pub pressed: bool,
}

impl MouseInput {
    /// Pointer movement. Always reported as released.
    pub fn hover(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            button: RemoteButton::Hover,
            pressed: false,
        }
    }

    pub fn press(x: i32, y: i32, button: RemoteButton) -> Self {
        Self {
            x,
            y,
            button,
            pressed: true,
        }
    }

    pub fn release(x: i32, y: i32, button: RemoteButton) -> Self {
        Self {
            x,
            y,
            button,
            pressed: false,
        }
    }
}

// ── InputEvent ───────────────────────────────────────────────────

/// Everything that travels from the local side to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyScancode(KeyScancode),
    KeyUnicode(KeyUnicode),
    Mouse(MouseInput),
    /// Local clipboard text (Unicode) offered to the remote session.
    ClipboardText(String),
    /// Local files offered to the remote session's clipboard.
    ClipboardFileList(Vec<PathBuf>),
    /// Stops the inbound pump. Never forwarded to the connection.
    Shutdown,
}

impl InputEvent {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::KeyScancode(_) => "key-scancode",
            InputEvent::KeyUnicode(_) => "key-unicode",
            InputEvent::Mouse(_) => "mouse",
            InputEvent::ClipboardText(_) => "clipboard-text",
            InputEvent::ClipboardFileList(_) => "clipboard-files",
            InputEvent::Shutdown => "shutdown",
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, InputEvent::Shutdown)
    }
}

impl From<KeyScancode> for InputEvent {
    fn from(k: KeyScancode) -> Self {
        InputEvent::KeyScancode(k)
    }
}

impl From<KeyUnicode> for InputEvent {
    fn from(k: KeyUnicode) -> Self {
        InputEvent::KeyUnicode(k)
    }
}

impl From<MouseInput> for InputEvent {
    fn from(m: MouseInput) -> Self {
        InputEvent::Mouse(m)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_key_names_follow_windows_naming() {
        assert_eq!(VirtualKey::Next.name(), "VK_NEXT");
        assert_eq!(VirtualKey::Snapshot.to_string(), "VK_SNAPSHOT");
    }

    #[test]
    fn hover_is_always_released() {
        let m = MouseInput::hover(3, 4);
        assert_eq!(m.button, RemoteButton::Hover);
        assert!(!m.pressed);
    }

    #[test]
    fn shutdown_is_recognised() {
        assert!(InputEvent::Shutdown.is_shutdown());
        let key: InputEvent = KeyScancode::press(0x1E, ModifierSet::empty()).into();
        assert!(!key.is_shutdown());
        assert_eq!(key.kind(), "key-scancode");
    }
}
