//! Win32 window creation and message loop.
//!
//! Creates the native HWND the display renderer draws into. The window
//! turns Win32 messages into [`WindowEvent`]s carrying the core crate's
//! local key and button identities, so the shell never sees raw
//! virtual-key codes.

use std::path::PathBuf;

use rview_core::{KeyId, LocalButton, LocalKey};

/// Events produced by the window message loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window close requested (Alt-F4/X button).
    Close,
    /// Client area resized.
    Resize(u32, u32),
    /// Mouse moved (client-relative coordinates).
    MouseMove(i32, i32),
    /// Mouse button pressed or released at a client position.
    MouseButton {
        button: LocalButton,
        pressed: bool,
        x: i32,
        y: i32,
    },
    /// Mouse wheel delta.
    MouseWheel(i16),
    /// Key down/up.
    Key(LocalKey),
    /// Files dropped onto the window.
    DropFiles(Vec<PathBuf>),
    /// The window lost keyboard focus.
    FocusLost,
}

// ── Key table ────────────────────────────────────────────────────

/// Map a Win32 virtual-key code to a [`KeyId`].
///
/// Navigation keys exist twice on a PC keyboard; the dedicated cluster
/// sets the extended flag, the numeric keypad does not. Only the
/// extended ones get their own identity.
pub fn key_from_virtual_key(vk: u16, extended: bool) -> KeyId {
    match (vk, extended) {
        (0x1B, _) => KeyId::Escape,
        (0x10 | 0xA0 | 0xA1, _) => KeyId::Shift,
        (0x11 | 0xA2 | 0xA3, _) => KeyId::Control,
        (0x12 | 0xA4 | 0xA5, _) => KeyId::Alt,
        (0x5B | 0x5C, _) => KeyId::Meta,
        (0x90, _) => KeyId::NumLock,
        (0x56, _) => KeyId::V,
        (0x13, _) => KeyId::Pause,
        (0x2C, _) => KeyId::PrintScreen,
        (0x5D, _) => KeyId::Menu,
        (0x6F, _) => KeyId::KeypadDivide,
        (0x6E, _) => KeyId::KeypadDecimal,
        (0x0D, true) => KeyId::KeypadEnter,
        (0x21, true) => KeyId::PageUp,
        (0x22, true) => KeyId::PageDown,
        (0x23, true) => KeyId::End,
        (0x24, true) => KeyId::Home,
        (0x25, true) => KeyId::Left,
        (0x26, true) => KeyId::Up,
        (0x27, true) => KeyId::Right,
        (0x28, true) => KeyId::Down,
        (0x2D, true) => KeyId::Insert,
        (0x2E, true) => KeyId::Delete,
        (other, _) => KeyId::Other(u32::from(other)),
    }
}

/// Set-1 scancode of a key message: extended keys get `0xE0` in the
/// high byte, so left and right Control stay distinct.
pub fn native_scancode(scan: u8, extended: bool) -> u32 {
    let scan = u32::from(scan);
    if extended { 0xE000 | scan } else { scan }
}

/// Map the `XBUTTON` word of a `WM_XBUTTON*` message.
pub fn button_from_xbutton(xbutton: u16) -> LocalButton {
    // XBUTTON1 = 1, XBUTTON2 = 2.
    LocalButton::Extra(xbutton.min(u16::from(u8::MAX)) as u8)
}

#[cfg(target_os = "windows")]
mod platform {
    use std::path::PathBuf;
    use std::sync::mpsc;

    use rview_core::{LocalButton, LocalKey, ModifierSet};
    use windows::Win32::Foundation::*;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::*;
    use windows::Win32::UI::Shell::{DragAcceptFiles, DragFinish, DragQueryFileW, HDROP};
    use windows::Win32::UI::WindowsAndMessaging::*;
    use windows::core::PCWSTR;

    use super::{WindowEvent, button_from_xbutton, key_from_virtual_key, native_scancode};

    /// Handle to the native window.
    pub struct NativeWindow {
        pub hwnd: HWND,
        pub width: u32,
        pub height: u32,
        event_rx: mpsc::Receiver<WindowEvent>,
    }

    fn point(lparam: LPARAM) -> (i32, i32) {
        let x = (lparam.0 & 0xFFFF) as i16 as i32;
        let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
        (x, y)
    }

    fn held(vk: VIRTUAL_KEY) -> bool {
        let state = unsafe { GetKeyState(vk.0 as i32) };
        state < 0
    }

    fn modifier_state() -> ModifierSet {
        let mut m = ModifierSet::empty();
        if held(VK_SHIFT) {
            m |= ModifierSet::SHIFT;
        }
        if held(VK_CONTROL) {
            m |= ModifierSet::CONTROL;
        }
        if held(VK_MENU) {
            m |= ModifierSet::ALT;
        }
        if held(VK_LWIN) || held(VK_RWIN) {
            m |= ModifierSet::WIN;
        }
        let numlock = unsafe { GetKeyState(VK_NUMLOCK.0 as i32) };
        if numlock & 1 != 0 {
            m |= ModifierSet::NUMLOCK;
        }
        m
    }

    fn key_event(wparam: WPARAM, lparam: LPARAM, pressed: bool) -> WindowEvent {
        let vk = (wparam.0 & 0xFFFF) as u16;
        let extended = (lparam.0 >> 24) & 1 == 1;
        let scan = native_scancode(((lparam.0 >> 16) & 0xFF) as u8, extended);
        let key = key_from_virtual_key(vk, extended);
        let modifiers = modifier_state();
        WindowEvent::Key(if pressed {
            LocalKey::press(key, scan, modifiers)
        } else {
            LocalKey::release(key, scan, modifiers)
        })
    }

    fn dropped_files(wparam: WPARAM) -> Vec<PathBuf> {
        let hdrop = HDROP(wparam.0 as *mut _);
        let mut paths = Vec::new();
        unsafe {
            let count = DragQueryFileW(hdrop, u32::MAX, None);
            for i in 0..count {
                let len = DragQueryFileW(hdrop, i, None) as usize;
                let mut buf = vec![0u16; len + 1];
                let written = DragQueryFileW(hdrop, i, Some(&mut buf)) as usize;
                paths.push(PathBuf::from(String::from_utf16_lossy(&buf[..written])));
            }
            DragFinish(hdrop);
        }
        paths
    }

    fn button(tx: &mpsc::Sender<WindowEvent>, button: LocalButton, pressed: bool, lparam: LPARAM) {
        let (x, y) = point(lparam);
        let _ = tx.send(WindowEvent::MouseButton { button, pressed, x, y });
    }

    // The sender lives in GWLP_USERDATA for the lifetime of the window.
    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let tx_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const mpsc::Sender<WindowEvent>;

        if tx_ptr.is_null() {
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let tx = unsafe { &*tx_ptr };

        match msg {
            WM_CLOSE => {
                let _ = tx.send(WindowEvent::Close);
                LRESULT(0)
            }
            WM_SIZE => {
                let (w, h) = point(lparam);
                let _ = tx.send(WindowEvent::Resize(w as u32, h as u32));
                LRESULT(0)
            }
            WM_MOUSEMOVE => {
                let (x, y) = point(lparam);
                let _ = tx.send(WindowEvent::MouseMove(x, y));
                LRESULT(0)
            }
            WM_LBUTTONDOWN | WM_LBUTTONUP => {
                button(tx, LocalButton::Left, msg == WM_LBUTTONDOWN, lparam);
                LRESULT(0)
            }
            WM_RBUTTONDOWN | WM_RBUTTONUP => {
                button(tx, LocalButton::Right, msg == WM_RBUTTONDOWN, lparam);
                LRESULT(0)
            }
            WM_MBUTTONDOWN | WM_MBUTTONUP => {
                button(tx, LocalButton::Middle, msg == WM_MBUTTONDOWN, lparam);
                LRESULT(0)
            }
            WM_XBUTTONDOWN | WM_XBUTTONUP => {
                let which = ((wparam.0 >> 16) & 0xFFFF) as u16;
                button(tx, button_from_xbutton(which), msg == WM_XBUTTONDOWN, lparam);
                LRESULT(1)
            }
            WM_MOUSEWHEEL => {
                let delta = ((wparam.0 >> 16) & 0xFFFF) as i16;
                let _ = tx.send(WindowEvent::MouseWheel(delta));
                LRESULT(0)
            }
            WM_KEYDOWN | WM_SYSKEYDOWN => {
                let _ = tx.send(key_event(wparam, lparam, true));
                LRESULT(0)
            }
            WM_KEYUP | WM_SYSKEYUP => {
                let _ = tx.send(key_event(wparam, lparam, false));
                LRESULT(0)
            }
            WM_KILLFOCUS => {
                let _ = tx.send(WindowEvent::FocusLost);
                LRESULT(0)
            }
            WM_DROPFILES => {
                let _ = tx.send(WindowEvent::DropFiles(dropped_files(wparam)));
                LRESULT(0)
            }
            WM_DESTROY => {
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    impl NativeWindow {
        /// Create a new top-level window that accepts dropped files.
        pub fn create(title: &str, width: u32, height: u32) -> Result<Self, String> {
            let (event_tx, event_rx) = mpsc::channel();

            let hinstance = unsafe { GetModuleHandleW(None) }
                .map_err(|e| format!("GetModuleHandle: {e}"))?;

            let class_name_wide: Vec<u16> = "RviewGuiClass\0".encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(wndproc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name_wide.as_ptr()),
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };

            let atom = unsafe { RegisterClassW(&wc) };
            if atom == 0 {
                return Err("RegisterClassW failed".into());
            }

            let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_ACCEPTFILES,
                    PCWSTR(class_name_wide.as_ptr()),
                    PCWSTR(title_wide.as_ptr()),
                    WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    width as i32,
                    height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|e| format!("CreateWindowExW failed: {e}"))?;

            if hwnd.is_invalid() {
                return Err("CreateWindowExW returned invalid HWND".into());
            }

            let tx_ptr = Box::into_raw(Box::new(event_tx));
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, tx_ptr as isize);
                DragAcceptFiles(hwnd, true);
            }

            Ok(Self {
                hwnd,
                width,
                height,
                event_rx,
            })
        }

        /// Pump window messages (non-blocking). Returns collected events.
        pub fn poll_events(&self) -> Vec<WindowEvent> {
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            self.event_rx.try_iter().collect()
        }

        /// The raw window handle.
        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }
    }

    impl Drop for NativeWindow {
        fn drop(&mut self) {
            unsafe {
                let ptr = GetWindowLongPtrW(self.hwnd, GWLP_USERDATA) as *mut mpsc::Sender<WindowEvent>;
                if !ptr.is_null() {
                    drop(Box::from_raw(ptr));
                    SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                }
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use super::WindowEvent;

    pub struct NativeWindow;

    impl NativeWindow {
        pub fn create(_title: &str, _w: u32, _h: u32) -> Result<Self, String> {
            Err("Window creation is only supported on Windows".into())
        }

        pub fn poll_events(&self) -> Vec<WindowEvent> {
            Vec::new()
        }

        pub fn hwnd(&self) {}
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;

// ── Tests ────────────────────────────────────────────────────────
