//! Framebuffer compositor.
//!
//! Holds the full session image and patches rectangle updates into it
//! as they arrive. Updates may come in any order and may overlap; the
//! last write wins per pixel. Anything that falls outside the buffer is
//! clipped, never rejected.

use tracing::{debug, trace};

use crate::display::types::{DisplayPatch, PixelFormat, Rect};

// ── Framebuffer ──────────────────────────────────────────────────

/// The mutable session image, sized once at session start.
///
/// Owned by the presentation side; never shared across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Framebuffer {
    /// Create a black framebuffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0u8; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row pitch in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Tightly packed pixel rows, top-down.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixel bytes at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.stride() + x as usize * bpp;
        Some(&self.data[offset..offset + bpp])
    }

    /// The whole buffer as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Composite `patch` into the buffer.
    ///
    /// A patch with exactly the buffer's dimensions and a complete payload
    /// replaces the buffer wholesale. Everything else is copied row by row
    /// into its sub-rectangle, clipped to the buffer. A payload shorter
    /// than `width * height` pixels contributes only its complete rows.
    ///
    /// Returns the region that actually changed, or `None` when nothing
    /// of the patch landed inside the buffer.
    pub fn apply_patch(&mut self, patch: DisplayPatch) -> Option<Rect> {
        if patch.is_empty() {
            trace!("ignoring empty patch at ({}, {})", patch.x, patch.y);
            return None;
        }

        if patch.width == self.width
            && patch.height == self.height
            && patch.pixels.len() == self.data.len()
        {
            self.data = patch.pixels;
            return Some(self.bounds());
        }

        self.copy_clipped(&patch)
    }

    // ── Internal ─────────────────────────────────────────────────

    fn copy_clipped(&mut self, patch: &DisplayPatch) -> Option<Rect> {
        if patch.x >= self.width || patch.y >= self.height {
            debug!(
                "patch at ({}, {}) lies outside {}x{} buffer",
                patch.x, patch.y, self.width, self.height
            );
            return None;
        }

        let bpp = self.format.bytes_per_pixel();
        let src_row_bytes = patch.width as usize * bpp;
        let complete_rows = patch.pixels.len() / src_row_bytes;
        if patch.pixels.len() < patch.expected_len(self.format) {
            debug!(
                "patch payload short: {} of {} rows present",
                complete_rows, patch.height
            );
        }

        let copy_w = patch.width.min(self.width - patch.x) as usize;
        let copy_h = (patch.height as usize)
            .min(complete_rows)
            .min((self.height - patch.y) as usize);
        if copy_w == 0 || copy_h == 0 {
            return None;
        }

        let stride = self.stride();
        let copy_bytes = copy_w * bpp;
        for row in 0..copy_h {
            let src = row * src_row_bytes;
            let dst = (patch.y as usize + row) * stride + patch.x as usize * bpp;
            self.data[dst..dst + copy_bytes].copy_from_slice(&patch.pixels[src..src + copy_bytes]);
        }

        Some(Rect::new(patch.x, patch.y, copy_w as u32, copy_h as u32))
    }
}

// ── Tests ────────────────────────────────────────────────────────
