//! Keyboard layouts for scancode-mode script replay.
//!
//! A layout answers "which key, with or without Shift, types this
//! character". Scancodes are PC set 1; extended keys carry `0xE0` in the
//! high byte.

use crate::error::ViewerError;

/// Set-1 scancodes used directly by the script injector.
pub mod scancode {
    pub const ESCAPE: u16 = 0x01;
    pub const BACKSPACE: u16 = 0x0E;
    pub const TAB: u16 = 0x0F;
    pub const ENTER: u16 = 0x1C;
    pub const LCTRL: u16 = 0x1D;
    pub const LSHIFT: u16 = 0x2A;
    pub const LALT: u16 = 0x38;
    pub const SPACE: u16 = 0x39;
    pub const CAPSLOCK: u16 = 0x3A;
    pub const NUMLOCK: u16 = 0x45;
    pub const SCROLLLOCK: u16 = 0x46;
    pub const F1: u16 = 0x3B;
    pub const F11: u16 = 0x57;
    pub const F12: u16 = 0x58;
    pub const PRINTSCREEN: u16 = 0xE037;
    pub const HOME: u16 = 0xE047;
    pub const UP: u16 = 0xE048;
    pub const PAGEUP: u16 = 0xE049;
    pub const LEFT: u16 = 0xE04B;
    pub const RIGHT: u16 = 0xE04D;
    pub const END: u16 = 0xE04F;
    pub const DOWN: u16 = 0xE050;
    pub const PAGEDOWN: u16 = 0xE051;
    pub const INSERT: u16 = 0xE052;
    pub const DELETE: u16 = 0xE053;
    pub const LWIN: u16 = 0xE05B;
    pub const MENU: u16 = 0xE05D;
}

/// Scancode for a named key as written in scripts (case-insensitive).
pub fn named_key(name: &str) -> Option<u16> {
    use scancode::*;

    let upper = name.to_ascii_uppercase();
    let code = match upper.as_str() {
        "ENTER" | "RETURN" => ENTER,
        "ESC" | "ESCAPE" => ESCAPE,
        "BACKSPACE" => BACKSPACE,
        "TAB" => TAB,
        "SPACE" => SPACE,
        "CAPSLOCK" => CAPSLOCK,
        "NUMLOCK" => NUMLOCK,
        "SCROLLLOCK" => SCROLLLOCK,
        "PRINTSCREEN" => PRINTSCREEN,
        "HOME" => HOME,
        "END" => END,
        "PAGEUP" => PAGEUP,
        "PAGEDOWN" => PAGEDOWN,
        "INSERT" => INSERT,
        "DELETE" | "DEL" => DELETE,
        "UP" | "UPARROW" => UP,
        "DOWN" | "DOWNARROW" => DOWN,
        "LEFT" | "LEFTARROW" => LEFT,
        "RIGHT" | "RIGHTARROW" => RIGHT,
        "GUI" | "WINDOWS" => LWIN,
        "MENU" | "APP" => MENU,
        "CTRL" | "CONTROL" => LCTRL,
        "ALT" => LALT,
        "SHIFT" => LSHIFT,
        "F11" => F11,
        "F12" => F12,
        other => {
            let n: u16 = other.strip_prefix('F')?.parse().ok()?;
            if (1..=10).contains(&n) {
                F1 + n - 1
            } else {
                return None;
            }
        }
    };
    Some(code)
}

// ── KeyStroke ────────────────────────────────────────────────────

/// One key on a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub scancode: u16,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(scancode: u16) -> Self {
        Self {
            scancode,
            shift: false,
        }
    }

    const fn shifted(scancode: u16) -> Self {
        Self {
            scancode,
            shift: true,
        }
    }
}

// ── KeyboardLayout ───────────────────────────────────────────────

/// Layouts known to the injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardLayout {
    /// US English (QWERTY).
    EnUs,
}

impl KeyboardLayout {
    /// Look a layout up by its short name (e.g. `enus`).
    pub fn by_short_name(name: &str) -> Result<Self, ViewerError> {
        match name.to_ascii_lowercase().as_str() {
            "enus" | "en-us" | "us" => Ok(KeyboardLayout::EnUs),
            _ => Err(ViewerError::UnknownLayout(name.to_string())),
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            KeyboardLayout::EnUs => "enus",
        }
    }

    /// The key (and Shift state) that types `ch`.
    pub fn stroke(self, ch: char) -> Option<KeyStroke> {
        match self {
            KeyboardLayout::EnUs => en_us(ch),
        }
    }
}

fn en_us(ch: char) -> Option<KeyStroke> {
    const ROW_Q: &str = "qwertyuiop";
    const ROW_A: &str = "asdfghjkl";
    const ROW_Z: &str = "zxcvbnm";

    if ch.is_ascii_uppercase() {
        return en_us(ch.to_ascii_lowercase()).map(|k| KeyStroke::shifted(k.scancode));
    }
    for (row, base) in [(ROW_Q, 0x10u16), (ROW_A, 0x1E), (ROW_Z, 0x2C)] {
        if let Some(i) = row.find(ch) {
            return Some(KeyStroke::plain(base + i as u16));
        }
    }

    let stroke = match ch {
        '1'..='9' => KeyStroke::plain(0x02 + (ch as u16 - '1' as u16)),
        '0' => KeyStroke::plain(0x0B),
        '!' => KeyStroke::shifted(0x02),
        '@' => KeyStroke::shifted(0x03),
        '#' => KeyStroke::shifted(0x04),
        '$' => KeyStroke::shifted(0x05),
        '%' => KeyStroke::shifted(0x06),
        '^' => KeyStroke::shifted(0x07),
        '&' => KeyStroke::shifted(0x08),
        '*' => KeyStroke::shifted(0x09),
        '(' => KeyStroke::shifted(0x0A),
        ')' => KeyStroke::shifted(0x0B),
        '-' => KeyStroke::plain(0x0C),
        '_' => KeyStroke::shifted(0x0C),
        '=' => KeyStroke::plain(0x0D),
        '+' => KeyStroke::shifted(0x0D),
        '[' => KeyStroke::plain(0x1A),
        '{' => KeyStroke::shifted(0x1A),
        ']' => KeyStroke::plain(0x1B),
        '}' => KeyStroke::shifted(0x1B),
        ';' => KeyStroke::plain(0x27),
        ':' => KeyStroke::shifted(0x27),
        '\'' => KeyStroke::plain(0x28),
        '"' => KeyStroke::shifted(0x28),
        '`' => KeyStroke::plain(0x29),
        '~' => KeyStroke::shifted(0x29),
        '\\' => KeyStroke::plain(0x2B),
        '|' => KeyStroke::shifted(0x2B),
        ',' => KeyStroke::plain(0x33),
        '<' => KeyStroke::shifted(0x33),
        '.' => KeyStroke::plain(0x34),
        '>' => KeyStroke::shifted(0x34),
        '/' => KeyStroke::plain(0x35),
        '?' => KeyStroke::shifted(0x35),
        ' ' => KeyStroke::plain(scancode::SPACE),
        '\n' => KeyStroke::plain(scancode::ENTER),
        '\t' => KeyStroke::plain(scancode::TAB),
        _ => return None,
    };
    Some(stroke)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_shifted_letters() {
        let us = KeyboardLayout::EnUs;
        assert_eq!(us.stroke('a'), Some(KeyStroke::plain(0x1E)));
        assert_eq!(us.stroke('A'), Some(KeyStroke::shifted(0x1E)));
        assert_eq!(us.stroke('p'), Some(KeyStroke::plain(0x19)));
        assert_eq!(us.stroke('m'), Some(KeyStroke::plain(0x32)));
    }

    #[test]
    fn digits_and_symbols() {
        let us = KeyboardLayout::EnUs;
        assert_eq!(us.stroke('1'), Some(KeyStroke::plain(0x02)));
        assert_eq!(us.stroke('0'), Some(KeyStroke::plain(0x0B)));
        assert_eq!(us.stroke('?'), Some(KeyStroke::shifted(0x35)));
        assert_eq!(us.stroke('\n'), Some(KeyStroke::plain(scancode::ENTER)));
        assert_eq!(us.stroke('é'), None);
    }

    #[test]
    fn named_keys() {
        assert_eq!(named_key("enter"), Some(scancode::ENTER));
        assert_eq!(named_key("UPARROW"), Some(scancode::UP));
        assert_eq!(named_key("F1"), Some(0x3B));
        assert_eq!(named_key("F10"), Some(0x44));
        assert_eq!(named_key("F12"), Some(scancode::F12));
        assert_eq!(named_key("F13"), None);
        assert_eq!(named_key("BOGUS"), None);
    }

    #[test]
    fn layout_lookup() {
        assert_eq!(KeyboardLayout::by_short_name("ENUS").unwrap(), KeyboardLayout::EnUs);
        assert!(matches!(
            KeyboardLayout::by_short_name("dvorak"),
            Err(ViewerError::UnknownLayout(_))
        ));
    }
}
