//! Shared types for the display pipeline.
//!
//! A [`DisplayPatch`] is what the connection hands over for every video
//! update; the [`Framebuffer`](super::Framebuffer) consumes it and the
//! patch is discarded afterwards.

use serde::{Deserialize, Serialize};

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of the framebuffer and of every patch applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, unused/alpha (GDI RGB32 layout).
    #[default]
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

// ── Rect ─────────────────────────────────────────────────────────

/// An axis-aligned rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether `(px, py)` lies inside the rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && (px as u64) < self.x as u64 + self.width as u64
            && (py as u64) < self.y as u64 + self.height as u64
    }
}

// ── DisplayPatch ─────────────────────────────────────────────────

/// A rectangle of new pixel data received from the remote session.
///
/// `pixels` holds `height` tightly-packed rows of `width` pixels each.
/// Patches are not validated on construction: the compositor clips
/// whatever does not fit instead of rejecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPatch {
    /// Left edge in framebuffer pixels.
    pub x: u32,
    /// Top edge in framebuffer pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw pixel payload.
    pub pixels: Vec<u8>,
}

impl DisplayPatch {
    pub fn new(x: u32, y: u32, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            pixels,
        }
    }

    /// A patch of `width × height` pixels all set to `pixel`.
    pub fn filled(x: u32, y: u32, width: u32, height: u32, pixel: &[u8]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            pixels.extend_from_slice(pixel);
        }
        Self::new(x, y, width, height, pixels)
    }

    /// Payload length a well-formed patch has for the given format.
    pub fn expected_len(&self, format: PixelFormat) -> usize {
        self.width as usize * self.height as usize * format.bytes_per_pixel()
    }

    /// The rectangle this patch claims to cover (before clipping).
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Whether the patch has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
