//! The runtime bridge.
//!
//! Owns a dedicated thread running a single-threaded tokio runtime that
//! drives one [`RemoteConnection`]. The presentation side talks to it
//! through a non-blocking inbound queue and hears back through an
//! [`EventSink`].
//!
//! ```text
//!  presentation thread            bridge thread
//!  ───────────────────            ─────────────────────────────────
//!  send(InputEvent) ──► inbound ──► inbound pump ──► connection.commands
//!                                   script injector ─┘ (same queue)
//!  EventSink ◄─────────────────── outbound pump ◄── connection.events
//! ```
//!
//! Teardown has a single exit path, so the disconnect notification fires
//! at most once, and never after [`RuntimeBridge::close`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::{Notify, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::bridge::sink::EventSink;
use crate::connection::RemoteConnection;
use crate::error::ViewerError;
use crate::protocol::{InputEvent, RemoteEvent};
use crate::script::{ScriptInjector, ScriptSettings};
use crate::session::SessionState;

/// Why the outbound pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    StopRequested,
    RemoteDisconnect,
    EventStreamClosed,
    ProtocolError,
}

// ── RuntimeBridge ────────────────────────────────────────────────

/// Handle to a running bridge.
pub struct RuntimeBridge {
    inbound: mpsc::UnboundedSender<InputEvent>,
    stop: CancellationToken,
    local_close: Arc<AtomicBool>,
    script_trigger: Arc<Notify>,
    state: watch::Receiver<SessionState>,
    thread: Option<JoinHandle<()>>,
}

impl RuntimeBridge {
    /// Spawn the bridge thread and start connecting.
    ///
    /// Returns immediately; connection progress is visible through
    /// [`state`](Self::state) and the sink.
    pub fn start<S: EventSink>(
        connection: Box<dyn RemoteConnection>,
        script: Option<ScriptSettings>,
        sink: S,
    ) -> Result<Self, ViewerError> {
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionState::Starting);
        let stop = CancellationToken::new();
        let local_close = Arc::new(AtomicBool::new(false));
        let script_trigger = Arc::new(Notify::new());

        let session = Session {
            connection,
            inbound_tx: inbound.clone(),
            script,
            script_trigger: Arc::clone(&script_trigger),
            sink,
            stop: stop.clone(),
            local_close: Arc::clone(&local_close),
            state_tx,
        };

        let thread = std::thread::Builder::new()
            .name("rview-bridge".into())
            .spawn(move || session.run_on_own_runtime(inbound_rx))
            .map_err(|e| ViewerError::Runtime(format!("cannot spawn bridge thread: {e}")))?;

        Ok(Self {
            inbound,
            stop,
            local_close,
            script_trigger,
            state,
            thread: Some(thread),
        })
    }

    /// Queue an input event for the connection. Never blocks.
    pub fn send(&self, event: InputEvent) -> Result<(), ViewerError> {
        self.inbound.send(event)?;
        Ok(())
    }

    /// A clonable handle onto the inbound queue.
    pub fn sender(&self) -> mpsc::UnboundedSender<InputEvent> {
        self.inbound.clone()
    }

    /// Start the script now (the trigger combo fired).
    pub fn trigger_script(&self) {
        self.script_trigger.notify_one();
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The presentation side is closing. Ends the session without a
    /// disconnect notification and stops forwarding patches.
    pub fn close(&self) {
        self.local_close.store(true, Ordering::SeqCst);
        self.stop.cancel();
    }

    /// End the session as if the remote side had. The sink receives one
    /// disconnect notification.
    pub fn terminate(&self) {
        self.stop.cancel();
    }

    /// Whether the bridge thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait up to `timeout` for the bridge thread to exit. Returns
    /// `true` if it did.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_finished() {
            if Instant::now() >= deadline {
                debug!("bridge still running after {timeout:?}");
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("bridge thread panicked");
            }
        }
        true
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Session (bridge thread) ──────────────────────────────────────

struct Session<S> {
    connection: Box<dyn RemoteConnection>,
    inbound_tx: mpsc::UnboundedSender<InputEvent>,
    script: Option<ScriptSettings>,
    script_trigger: Arc<Notify>,
    sink: S,
    stop: CancellationToken,
    local_close: Arc<AtomicBool>,
    state_tx: watch::Sender<SessionState>,
}

impl<S: EventSink> Session<S> {
    fn run_on_own_runtime(mut self, inbound_rx: mpsc::UnboundedReceiver<InputEvent>) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        match runtime {
            Ok(runtime) => runtime.block_on(self.run(inbound_rx)),
            Err(e) => {
                error!("cannot build bridge runtime: {e}");
                self.state_tx.send_replace(SessionState::Terminated);
                self.notify_disconnected();
            }
        }
    }

    fn publish(&self, state: &SessionState) {
        debug!("session state -> {state}");
        self.state_tx.send_replace(state.clone());
    }

    fn is_local_close(&self) -> bool {
        self.local_close.load(Ordering::SeqCst)
    }

    fn notify_disconnected(&mut self) {
        if self.is_local_close() {
            debug!("session closed locally; no disconnect notification");
        } else {
            self.sink.on_disconnected();
        }
    }

    async fn run(mut self, inbound_rx: mpsc::UnboundedReceiver<InputEvent>) {
        let mut state = SessionState::Starting;
        let dialect = self.connection.dialect();

        let connected = tokio::select! {
            _ = self.stop.cancelled() => Err(ViewerError::Connect("stopped while connecting".into())),
            result = self.connection.connect() => result,
        };
        let mut channels = match connected {
            Ok(channels) => channels,
            Err(e) => {
                warn!("{dialect} connection failed: {e}");
                if let Err(e) = state.connect_failed() {
                    warn!("{e}");
                }
                self.publish(&state);
                self.notify_disconnected();
                return;
            }
        };
        if let Err(e) = state.connect_established() {
            warn!("{e}");
        }
        self.publish(&state);
        info!("{dialect} session connected");

        // ── Pumps ───────────────────────────────────────────────
        let pumps_cancel = self.stop.child_token();
        let inbound = tokio::spawn(inbound_pump(
            inbound_rx,
            channels.commands.clone(),
            pumps_cancel.clone(),
        ));
        let script = self.script.take().map(|settings| {
            let injector = ScriptInjector::new(
                settings,
                dialect,
                self.inbound_tx.clone(),
                Arc::clone(&self.script_trigger),
                pumps_cancel.clone(),
            );
            tokio::spawn(injector.run())
        });

        let reason = loop {
            let event = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break StopReason::StopRequested,
                _ = channels.disconnected.cancelled() => break StopReason::RemoteDisconnect,
                event = channels.events.recv() => event,
            };
            match event {
                Some(Ok(event)) => self.dispatch(event),
                Some(Err(e)) => {
                    warn!("session error: {e}");
                    break StopReason::ProtocolError;
                }
                None => break StopReason::EventStreamClosed,
            }
        };
        match state.connected_duration() {
            Some(elapsed) => info!("session stopping after {elapsed:?} ({reason:?})"),
            None => info!("session stopping ({reason:?})"),
        }

        // ── Teardown ────────────────────────────────────────────
        if let Err(e) = state.begin_stop() {
            warn!("{e}");
        }
        self.publish(&state);

        pumps_cancel.cancel();
        if let Err(e) = self.connection.terminate().await {
            warn!("terminate: {e}");
        }
        if let Err(e) = inbound.await {
            warn!("inbound pump: {e}");
        }
        if let Some(script) = script {
            if let Err(e) = script.await {
                warn!("script injector: {e}");
            }
        }
        drop(channels);

        if let Err(e) = state.finish_stop() {
            warn!("{e}");
        }
        self.publish(&state);
        self.notify_disconnected();
    }

    fn dispatch(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Video(patch) => {
                if self.is_local_close() {
                    trace!("dropping patch after local close");
                } else {
                    self.sink.on_patch(patch);
                }
            }
            RemoteEvent::ClipboardDataText(text) => {
                debug!("remote clipboard text ({} bytes)", text.len())
            }
            RemoteEvent::Other(kind) => debug!("unhandled event {kind}"),
            ack => trace!("ignoring {}", ack.kind()),
        }
    }
}

/// Move inbound events into the connection's command queue until the
/// shutdown sentinel, cancellation, or a closed queue on either side.
async fn inbound_pump(
    mut inbound: mpsc::UnboundedReceiver<InputEvent>,
    commands: mpsc::UnboundedSender<InputEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = inbound.recv() => event,
        };
        match event {
            None | Some(InputEvent::Shutdown) => break,
            Some(event) => {
                trace!("forwarding {}", event.kind());
                if commands.send(event).is_err() {
                    debug!("connection command queue closed");
                    break;
                }
            }
        }
    }
    debug!("inbound pump finished");
}

// ── Tests ────────────────────────────────────────────────────────
