//! Session image: pixel types and the framebuffer compositor.

pub mod compositor;
pub mod types;

pub use compositor::Framebuffer;
pub use types::{DisplayPatch, PixelFormat, Rect};
