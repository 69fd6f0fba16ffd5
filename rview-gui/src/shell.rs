//! Presentation shell.
//!
//! Lives on the window thread. Owns the framebuffer and the input
//! encoders, feeds encoded input into the runtime bridge and drains the
//! bridge's marshaled events back onto this thread.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use rview_core::input::encode_drop;
use rview_core::{
    BridgeEvent, ChannelSink, ClipboardSource, ConnectionSettings, Framebuffer, InputEvent,
    KeyEncoder, LocalKey, MouseEncoder, PixelFormat, RemoteConnection, RepeatTrigger,
    RuntimeBridge, ScriptSettings, SessionState, ViewerError,
};

use crate::display::Surface;
use crate::window::WindowEvent;

/// How long `close` waits for the bridge thread.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Whether the window loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellControl {
    Continue,
    Exit,
}

/// Input switches for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOptions {
    pub keyboard: bool,
    pub mouse_hover: bool,
    pub scancode_offset: u32,
}

/// Scale a window-relative point onto the framebuffer, clamped to it.
pub fn scale_point(x: i32, y: i32, window: (u32, u32), frame: (u32, u32)) -> (i32, i32) {
    let scale = |v: i32, win: u32, fb: u32| -> i32 {
        if win == 0 || fb == 0 {
            return 0;
        }
        let scaled = i64::from(v) * i64::from(fb) / i64::from(win);
        scaled.clamp(0, i64::from(fb) - 1) as i32
    };
    (scale(x, window.0, frame.0), scale(y, window.1, frame.1))
}

// ── PresentationShell ────────────────────────────────────────────

pub struct PresentationShell<C: ClipboardSource> {
    framebuffer: Framebuffer,
    keys: KeyEncoder,
    mouse: MouseEncoder,
    trigger: RepeatTrigger,
    keyboard: bool,
    clipboard: C,
    bridge: RuntimeBridge,
    events: Receiver<BridgeEvent>,
    window_size: (u32, u32),
    pending_resize: Option<(u32, u32)>,
    dirty: bool,
    closed: bool,
}

impl<C: ClipboardSource> PresentationShell<C> {
    /// Create the framebuffer and start the bridge for `connection`.
    pub fn start(
        connection: Box<dyn RemoteConnection>,
        settings: &ConnectionSettings,
        options: ShellOptions,
        script: Option<ScriptSettings>,
        clipboard: C,
    ) -> Result<Self, ViewerError> {
        let (sink, events) = ChannelSink::new();
        let bridge = RuntimeBridge::start(connection, script, sink)?;
        info!(
            "viewer {}x{} (keyboard {}, hover {})",
            settings.width,
            settings.height,
            if options.keyboard { "on" } else { "off" },
            if options.mouse_hover { "on" } else { "off" },
        );
        Ok(Self {
            framebuffer: Framebuffer::new(settings.width, settings.height, PixelFormat::Bgra8),
            keys: KeyEncoder::new(options.scancode_offset),
            mouse: MouseEncoder::new(options.mouse_hover),
            trigger: RepeatTrigger::default(),
            keyboard: options.keyboard,
            clipboard,
            bridge,
            events,
            window_size: (settings.width, settings.height),
            pending_resize: None,
            dirty: true,
            closed: false,
        })
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn session_state(&self) -> SessionState {
        self.bridge.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn forward(&self, event: InputEvent) {
        let kind = event.kind();
        if let Err(e) = self.bridge.send(event) {
            debug!("dropping {kind}: {e}");
        }
    }

    fn frame_point(&self, x: i32, y: i32) -> (i32, i32) {
        scale_point(
            x,
            y,
            self.window_size,
            (self.framebuffer.width(), self.framebuffer.height()),
        )
    }

    // ── Window side ──────────────────────────────────────────────

    /// Handle one window event.
    pub fn handle_window_event(&mut self, event: WindowEvent) -> ShellControl {
        if self.closed {
            return ShellControl::Exit;
        }
        match event {
            WindowEvent::Close => {
                self.close();
                return ShellControl::Exit;
            }
            WindowEvent::Resize(w, h) => {
                self.window_size = (w, h);
                self.pending_resize = Some((w, h));
                self.dirty = true;
            }
            WindowEvent::MouseMove(x, y) => {
                let (x, y) = self.frame_point(x, y);
                if let Some(ev) = self.mouse.encode_move(x, y) {
                    self.forward(ev);
                }
            }
            WindowEvent::MouseButton { button, pressed, x, y } => {
                let (x, y) = self.frame_point(x, y);
                if let Some(ev) = self.mouse.encode_button(button, pressed, x, y) {
                    self.forward(ev);
                }
            }
            WindowEvent::MouseWheel(delta) => trace!("wheel {delta} not forwarded"),
            WindowEvent::Key(key) => self.handle_key(key),
            WindowEvent::FocusLost => self.keys.release_all(),
            WindowEvent::DropFiles(paths) => {
                if let Some(ev) = encode_drop(paths) {
                    self.forward(ev);
                }
            }
        }
        ShellControl::Continue
    }

    fn handle_key(&mut self, key: LocalKey) {
        if self.trigger.observe(&key) {
            info!("script trigger pressed");
            self.bridge.trigger_script();
        }
        if !self.keyboard {
            return;
        }
        for ev in self.keys.encode(&key, &mut self.clipboard) {
            self.forward(ev);
        }
    }

    // ── Bridge side ──────────────────────────────────────────────

    /// Apply every patch the bridge has delivered so far.
    pub fn pump_bridge_events(&mut self) -> ShellControl {
        loop {
            match self.events.try_recv() {
                Ok(BridgeEvent::Patch(patch)) => {
                    if self.framebuffer.apply_patch(patch).is_some() {
                        self.dirty = true;
                    }
                }
                Ok(BridgeEvent::Disconnected) => {
                    info!("session ended remotely");
                    self.closed = true;
                    return ShellControl::Exit;
                }
                Err(TryRecvError::Empty) => return ShellControl::Continue,
                // Bridge thread gone after a local close.
                Err(TryRecvError::Disconnected) => return ShellControl::Exit,
            }
        }
    }

    /// Draw the framebuffer if anything changed since the last call.
    pub fn present(&mut self, surface: &mut dyn Surface) {
        if let Some((w, h)) = self.pending_resize.take() {
            surface.resize(w, h);
        }
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if let Err(e) = surface.present(&self.framebuffer) {
            warn!("render error: {e}");
        }
    }

    /// Local close: stop the pumps and wait briefly for the bridge.
    /// Returns `true` if the bridge finished within the grace period.
    pub fn close(&mut self) -> bool {
        if !self.closed {
            self.closed = true;
            self.forward(InputEvent::Shutdown);
            self.bridge.close();
        }
        let finished = self.bridge.wait(SHUTDOWN_GRACE);
        if !finished {
            warn!("bridge did not stop within {SHUTDOWN_GRACE:?}");
        }
        finished
    }
}

// ── Tests ────────────────────────────────────────────────────────
