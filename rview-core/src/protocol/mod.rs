//! Objects exchanged with the connection collaborator.
//!
//! [`input`] holds the commands the local side sends; [`event`] holds
//! the events the connection produces.

pub mod event;
pub mod input;

pub use event::RemoteEvent;
pub use input::{
    InputEvent, KeyScancode, KeyUnicode, ModifierSet, MouseInput, RemoteButton, VirtualKey,
};
