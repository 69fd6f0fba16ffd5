//! Local key and button identities and the fixed lookup tables that map
//! them onto connection-level codes.
//!
//! The tables are plain `match` expressions: immutable, allocation-free
//! and resolved at compile time.

use crate::protocol::input::{ModifierSet, RemoteButton, VirtualKey};

// ── KeyId ────────────────────────────────────────────────────────

/// Logical identity of a local key, as reported by the window surface.
///
/// Only keys the encoder treats specially have their own variant;
/// everything else is `Other` carrying the platform key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyId {
    Escape,
    Shift,
    Control,
    Alt,
    Meta,
    NumLock,
    V,
    End,
    Down,
    PageDown,
    Insert,
    Delete,
    PrintScreen,
    Home,
    Up,
    PageUp,
    Left,
    Right,
    KeypadEnter,
    Menu,
    Pause,
    KeypadDivide,
    KeypadDecimal,
    Other(u32),
}

impl KeyId {
    /// Virtual-key override for keys whose scancode is ambiguous on the
    /// remote side.
    pub const fn extended_override(self) -> Option<VirtualKey> {
        match self {
            KeyId::End => Some(VirtualKey::End),
            KeyId::Down => Some(VirtualKey::Down),
            KeyId::PageDown => Some(VirtualKey::Next),
            KeyId::Insert => Some(VirtualKey::Insert),
            KeyId::Delete => Some(VirtualKey::Delete),
            KeyId::PrintScreen => Some(VirtualKey::Snapshot),
            KeyId::Home => Some(VirtualKey::Home),
            KeyId::Up => Some(VirtualKey::Up),
            KeyId::PageUp => Some(VirtualKey::Prior),
            KeyId::Left => Some(VirtualKey::Left),
            KeyId::Right => Some(VirtualKey::Right),
            KeyId::Meta => Some(VirtualKey::LWin),
            KeyId::KeypadEnter => Some(VirtualKey::Return),
            KeyId::Menu => Some(VirtualKey::LMenu),
            KeyId::Pause => Some(VirtualKey::Pause),
            KeyId::KeypadDivide => Some(VirtualKey::Divide),
            KeyId::KeypadDecimal => Some(VirtualKey::Decimal),
            _ => None,
        }
    }

    /// The modifier bit this key toggles, if it is a modifier key.
    pub const fn modifier(self) -> Option<ModifierSet> {
        match self {
            KeyId::Shift => Some(ModifierSet::SHIFT),
            KeyId::Control => Some(ModifierSet::CONTROL),
            KeyId::Alt => Some(ModifierSet::ALT),
            KeyId::Meta => Some(ModifierSet::WIN),
            KeyId::NumLock => Some(ModifierSet::NUMLOCK),
            _ => None,
        }
    }
}

// ── LocalKey ─────────────────────────────────────────────────────

/// A raw key event from the window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalKey {
    pub key: KeyId,
    /// Scancode as the platform reports it (before any offset shim).
    pub native_scancode: u32,
    pub pressed: bool,
    /// Global modifier state at the time of the event.
    pub modifiers: ModifierSet,
}

impl LocalKey {
    pub fn press(key: KeyId, native_scancode: u32, modifiers: ModifierSet) -> Self {
        Self {
            key,
            native_scancode,
            pressed: true,
            modifiers,
        }
    }

    pub fn release(key: KeyId, native_scancode: u32, modifiers: ModifierSet) -> Self {
        Self {
            key,
            native_scancode,
            pressed: false,
            modifiers,
        }
    }
}

// ── LocalButton ──────────────────────────────────────────────────

/// Mouse buttons as reported by the window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalButton {
    Left,
    Right,
    Middle,
    /// Extended buttons, numbered from 1 (XBUTTON1 is `Extra(1)`).
    Extra(u8),
}

impl LocalButton {
    /// Connection button code, or `None` for buttons without a mapping.
    pub const fn to_remote(self) -> Option<RemoteButton> {
        match self {
            LocalButton::Left => Some(RemoteButton::Left),
            LocalButton::Right => Some(RemoteButton::Right),
            LocalButton::Middle => Some(RemoteButton::Middle),
            LocalButton::Extra(1) => Some(RemoteButton::Button5),
            LocalButton::Extra(2) => Some(RemoteButton::Button6),
            LocalButton::Extra(3) => Some(RemoteButton::Button7),
            LocalButton::Extra(4) => Some(RemoteButton::Button8),
            LocalButton::Extra(5) => Some(RemoteButton::Button9),
            LocalButton::Extra(6) => Some(RemoteButton::Button10),
            LocalButton::Extra(_) => None,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
