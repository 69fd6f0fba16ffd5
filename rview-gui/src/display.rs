//! Display renderer: blits the session framebuffer to the window.
//!
//! Uses GDI `StretchDIBits`; the framebuffer is stretched to fill the
//! client area.

use rview_core::Framebuffer;

/// Something the shell can present the framebuffer on.
pub trait Surface {
    /// Draw the whole framebuffer.
    fn present(&mut self, frame: &Framebuffer) -> Result<(), String>;

    /// The client area changed size.
    fn resize(&mut self, width: u32, height: u32);
}

#[cfg(target_os = "windows")]
mod platform {
    use rview_core::{Framebuffer, PixelFormat};
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;

    use super::Surface;

    /// Renders BGRA8 framebuffers into an HWND using GDI.
    pub struct DisplayRenderer {
        hwnd: HWND,
        width: u32,
        height: u32,
    }

    impl DisplayRenderer {
        /// Create a renderer targeting the given window.
        pub fn new(hwnd: HWND, width: u32, height: u32) -> Self {
            Self { hwnd, width, height }
        }
    }

    impl Surface for DisplayRenderer {
        fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn present(&mut self, frame: &Framebuffer) -> Result<(), String> {
            if frame.format() != PixelFormat::Bgra8 {
                return Err(format!("cannot blit {:?} framebuffer", frame.format()));
            }
            let (frame_width, frame_height) = (frame.width(), frame.height());
            let data = frame.data();
            if data.is_empty() {
                return Ok(());
            }

            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err("GetDC failed".into());
                }

                let bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: frame_width as i32,
                        // Negative height = top-down DIB.
                        biHeight: -(frame_height as i32),
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                StretchDIBits(
                    hdc,
                    0,
                    0,
                    self.width as i32,
                    self.height as i32,
                    0,
                    0,
                    frame_width as i32,
                    frame_height as i32,
                    Some(data.as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);
            }

            Ok(())
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use rview_core::Framebuffer;

    use super::Surface;

    pub struct DisplayRenderer;

    impl DisplayRenderer {
        pub fn new(_hwnd: (), _w: u32, _h: u32) -> Self {
            Self
        }
    }

    impl Surface for DisplayRenderer {
        fn resize(&mut self, _w: u32, _h: u32) {}

        fn present(&mut self, _frame: &Framebuffer) -> Result<(), String> {
            Err("Display rendering is only supported on Windows".into())
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
