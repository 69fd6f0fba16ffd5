//! Local input handling: key/button identities, the encoder that turns
//! them into connection commands, and the script hot-key trigger.

pub mod encoder;
pub mod keys;
pub mod trigger;

pub use encoder::{
    ClipboardSource, KeyEncoder, MouseEncoder, effective_modifiers, encode_drop,
    platform_scancode_offset,
};
pub use keys::{KeyId, LocalButton, LocalKey};
pub use trigger::RepeatTrigger;
