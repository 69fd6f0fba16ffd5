//! Repeated-key trigger for starting the keystroke script by hand.

use crate::input::keys::{KeyId, LocalKey};

/// Presses of the trigger key needed to fire.
pub const DEFAULT_TRIGGER_PRESSES: u32 = 3;

/// Counts consecutive presses of one designated key.
///
/// Any other key press resets the count; releases are ignored. After
/// firing the count starts over.
#[derive(Debug, Clone)]
pub struct RepeatTrigger {
    key: KeyId,
    threshold: u32,
    count: u32,
}

impl RepeatTrigger {
    pub fn new(key: KeyId, threshold: u32) -> Self {
        Self {
            key,
            threshold: threshold.max(1),
            count: 0,
        }
    }

    /// Feed a key event; returns `true` when the trigger fires.
    pub fn observe(&mut self, key: &LocalKey) -> bool {
        if !key.pressed {
            return false;
        }
        if key.key != self.key {
            self.count = 0;
            return false;
        }
        self.count += 1;
        if self.count >= self.threshold {
            self.count = 0;
            return true;
        }
        false
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for RepeatTrigger {
    /// Escape pressed three times in a row.
    fn default() -> Self {
        Self::new(KeyId::Escape, DEFAULT_TRIGGER_PRESSES)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::input::ModifierSet;

    fn esc(pressed: bool) -> LocalKey {
        LocalKey {
            key: KeyId::Escape,
            native_scancode: 0x01,
            pressed,
            modifiers: ModifierSet::empty(),
        }
    }

    #[test]
    fn fires_on_third_press() {
        let mut t = RepeatTrigger::default();
        assert!(!t.observe(&esc(true)));
        assert!(!t.observe(&esc(false)));
        assert!(!t.observe(&esc(true)));
        assert!(t.observe(&esc(true)));
        assert_eq!(t.count(), 0);
    }

    #[test]
    fn other_key_resets() {
        let mut t = RepeatTrigger::default();
        t.observe(&esc(true));
        t.observe(&esc(true));
        t.observe(&LocalKey::press(KeyId::Other(0x41), 0x1E, ModifierSet::empty()));
        assert_eq!(t.count(), 0);
        assert!(!t.observe(&esc(true)));
    }
}
