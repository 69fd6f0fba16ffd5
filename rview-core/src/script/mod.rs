//! Scripted keystroke injection.
//!
//! [`reader`] parses script files, [`layout`] maps characters to keys and
//! [`injector`] replays the result into a session.

pub mod injector;
pub mod layout;
pub mod reader;

pub use injector::{
    KEY_FLUSH_DELAY, KeyAction, ReplayOutcome, ScriptCursor, ScriptInjector, ScriptSettings,
    StartMode, compile,
};
pub use layout::{KeyStroke, KeyboardLayout, named_key};
pub use reader::{ChordKey, Script, ScriptStep};
