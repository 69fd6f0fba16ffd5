//! Callbacks from the bridge into the presentation side.

use std::sync::mpsc;

use crate::display::DisplayPatch;

/// Receiver of bridge callbacks. Called on the bridge thread.
pub trait EventSink: Send + 'static {
    /// A video patch arrived.
    fn on_patch(&mut self, patch: DisplayPatch);

    /// The session ended without the presentation side asking for it.
    /// Called at most once.
    fn on_disconnected(&mut self);
}

/// A bridge callback marshaled onto the presentation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Patch(DisplayPatch),
    Disconnected,
}

/// [`EventSink`] that forwards every callback into a std channel, so the
/// presentation loop can drain it on its own thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BridgeEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<BridgeEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_patch(&mut self, patch: DisplayPatch) {
        // The presentation side may already be gone.
        let _ = self.tx.send(BridgeEvent::Patch(patch));
    }

    fn on_disconnected(&mut self) {
        let _ = self.tx.send(BridgeEvent::Disconnected);
    }
}
