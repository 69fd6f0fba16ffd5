//! In-process loopback session.
//!
//! Behaves like a remote desktop that never leaves the machine: it
//! paints a test pattern on connect, echoes clipboard text back, and
//! otherwise swallows input. A [`LoopbackProbe`] lets the caller drive
//! the remote side by hand: inject events, watch the commands that
//! reach the connection, drop the link, or refuse the handshake.
//!
//! URL schemes: `loopback://` (RDP dialect) and `loopback+vnc://`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::{
    ConnectionSettings, Connector, Dialect, RemoteConnection, SessionChannels, SessionTarget,
};
use crate::display::{DisplayPatch, PixelFormat};
use crate::error::ViewerError;
use crate::protocol::{InputEvent, RemoteEvent};

type EventResult = Result<RemoteEvent, ViewerError>;

// ── LoopbackConnection ───────────────────────────────────────────

/// A [`RemoteConnection`] served entirely in-process.
pub struct LoopbackConnection {
    dialect: Dialect,
    width: u32,
    height: u32,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<EventResult>,
    event_rx: Option<mpsc::UnboundedReceiver<EventResult>>,
    tap_tx: mpsc::UnboundedSender<InputEvent>,
    probe: Option<LoopbackProbe>,
    echo_task: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

/// State shared between the connection and its probe.
struct Shared {
    refuse_connect: AtomicBool,
    terminate_calls: AtomicUsize,
    disconnected: CancellationToken,
}

impl Shared {
    fn new() -> Self {
        Self {
            refuse_connect: AtomicBool::new(false),
            terminate_calls: AtomicUsize::new(0),
            disconnected: CancellationToken::new(),
        }
    }
}

impl LoopbackConnection {
    /// A loopback desktop of `width × height` BGRA pixels.
    pub fn new(dialect: Dialect, width: u32, height: u32) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (tap_tx, tap_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());
        let probe = LoopbackProbe {
            commands: tap_rx,
            events: event_tx.clone(),
            shared: Arc::clone(&shared),
        };
        Self {
            dialect,
            width,
            height,
            shared,
            event_tx,
            event_rx: Some(event_rx),
            tap_tx,
            probe: Some(probe),
            echo_task: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Take the probe for this connection. Available once.
    pub fn probe(&mut self) -> Option<LoopbackProbe> {
        self.probe.take()
    }

    /// The full-frame test pattern painted on connect.
    pub fn test_pattern(width: u32, height: u32) -> DisplayPatch {
        let bpp = PixelFormat::Bgra8.bytes_per_pixel();
        let mut pixels = Vec::with_capacity(width as usize * height as usize * bpp);
        for y in 0..height {
            for x in 0..width {
                let b = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let r = if (x / 32 + y / 32) % 2 == 0 { 0x40 } else { 0xC0 };
                pixels.extend_from_slice(&[b, g, r, 0xFF]);
            }
        }
        DisplayPatch::new(0, 0, width, height, pixels)
    }
}

#[async_trait]
impl RemoteConnection for LoopbackConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn connect(&mut self) -> Result<SessionChannels, ViewerError> {
        if self.shared.refuse_connect.load(Ordering::SeqCst) {
            return Err(ViewerError::Connect("loopback peer refused the session".into()));
        }
        let events = self
            .event_rx
            .take()
            .ok_or_else(|| ViewerError::Connect("loopback session already connected".into()))?;

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<InputEvent>();

        let _ = self.event_tx.send(Ok(RemoteEvent::ClipboardReady));
        let _ = self
            .event_tx
            .send(Ok(RemoteEvent::Video(Self::test_pattern(self.width, self.height))));

        let event_tx = self.event_tx.clone();
        let tap_tx = self.tap_tx.clone();
        let shutdown = self.shutdown.clone();
        self.echo_task = Some(tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    command = command_rx.recv() => match command {
                        Some(command) => command,
                        None => break,
                    },
                };
                match &command {
                    InputEvent::ClipboardText(text) => {
                        let _ = event_tx.send(Ok(RemoteEvent::ClipboardDataText(text.clone())));
                    }
                    InputEvent::ClipboardFileList(_) => {
                        let _ = event_tx.send(Ok(RemoteEvent::ClipboardConsumed));
                    }
                    _ => {}
                }
                let _ = tap_tx.send(command);
            }
            debug!("loopback echo task finished");
        }));

        info!("loopback {} session up ({}x{})", self.dialect, self.width, self.height);
        Ok(SessionChannels {
            commands: command_tx,
            events,
            disconnected: self.shared.disconnected.clone(),
        })
    }

    async fn terminate(&mut self) -> Result<(), ViewerError> {
        self.shared.terminate_calls.fetch_add(1, Ordering::SeqCst);
        self.shutdown.cancel();
        if let Some(task) = self.echo_task.take() {
            let _ = task.await;
        }
        debug!("loopback session terminated");
        Ok(())
    }
}

// ── LoopbackProbe ────────────────────────────────────────────────

/// The remote end of a [`LoopbackConnection`].
pub struct LoopbackProbe {
    /// Every command that reached the connection, in order.
    pub commands: mpsc::UnboundedReceiver<InputEvent>,
    events: mpsc::UnboundedSender<EventResult>,
    shared: Arc<Shared>,
}

impl LoopbackProbe {
    /// Queue an event as if the remote side produced it.
    pub fn send(&self, event: RemoteEvent) -> Result<(), ViewerError> {
        self.events.send(Ok(event))?;
        Ok(())
    }

    /// Queue a protocol failure.
    pub fn fail(&self, message: impl Into<String>) -> Result<(), ViewerError> {
        self.events.send(Err(ViewerError::Protocol(message.into())))?;
        Ok(())
    }

    /// Drop the link from the remote side.
    pub fn disconnect(&self) {
        self.shared.disconnected.cancel();
    }

    /// Make the next handshake fail.
    pub fn refuse_connect(&self) {
        self.shared.refuse_connect.store(true, Ordering::SeqCst);
    }

    /// How often `terminate` was called on the connection.
    pub fn terminate_calls(&self) -> usize {
        self.shared.terminate_calls.load(Ordering::SeqCst)
    }
}

// ── LoopbackConnector ────────────────────────────────────────────

/// Connector for the `loopback` schemes.
pub struct LoopbackConnector;

impl Connector for LoopbackConnector {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "loopback" || scheme == "loopback+vnc"
    }

    fn open(
        &self,
        target: &SessionTarget,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn RemoteConnection>, ViewerError> {
        Ok(Box::new(LoopbackConnection::new(
            target.dialect(),
            settings.width,
            settings.height,
        )))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_paints_full_frame() {
        let mut conn = LoopbackConnection::new(Dialect::Rdp, 8, 4);
        let mut channels = conn.connect().await.unwrap();

        assert_eq!(channels.events.recv().await.unwrap().unwrap(), RemoteEvent::ClipboardReady);
        match channels.events.recv().await.unwrap().unwrap() {
            RemoteEvent::Video(patch) => {
                assert_eq!((patch.width, patch.height), (8, 4));
                assert_eq!(patch.pixels.len(), 8 * 4 * 4);
            }
            other => panic!("expected video, got {other:?}"),
        }
        conn.terminate().await.unwrap();
    }

    #[tokio::test]
    async fn clipboard_text_is_echoed_and_tapped() {
        let mut conn = LoopbackConnection::new(Dialect::Rdp, 2, 2);
        let mut probe = conn.probe().unwrap();
        let mut channels = conn.connect().await.unwrap();
        channels.events.recv().await;
        channels.events.recv().await;

        channels.commands.send(InputEvent::ClipboardText("hi".into())).unwrap();
        assert_eq!(
            channels.events.recv().await.unwrap().unwrap(),
            RemoteEvent::ClipboardDataText("hi".into())
        );
        assert_eq!(probe.commands.recv().await, Some(InputEvent::ClipboardText("hi".into())));

        conn.terminate().await.unwrap();
        assert_eq!(probe.terminate_calls(), 1);
    }

    #[tokio::test]
    async fn refused_connect_fails() {
        let mut conn = LoopbackConnection::new(Dialect::Vnc, 2, 2);
        conn.probe().unwrap().refuse_connect();
        assert!(matches!(conn.connect().await, Err(ViewerError::Connect(_))));
    }

    #[test]
    fn connect_twice_fails() {
        tokio_test::block_on(async {
            let mut conn = LoopbackConnection::new(Dialect::Rdp, 2, 2);
            assert!(conn.connect().await.is_ok());
            assert!(conn.connect().await.is_err());
            conn.terminate().await.unwrap();
        });
    }
}
