//! Events produced by the connection for the local side.

use crate::display::DisplayPatch;

/// A tagged event from the connection's event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// A rectangle of new pixels.
    Video(DisplayPatch),
    /// The remote clipboard channel is ready.
    ClipboardReady,
    /// The remote clipboard has new data on offer.
    ClipboardNewDataAvailable,
    /// The remote side consumed the clipboard data we offered.
    ClipboardConsumed,
    /// Remote clipboard text.
    ClipboardDataText(String),
    /// Anything the viewer has no handler for; carries the kind name.
    Other(String),
}

impl RemoteEvent {
    /// Short label used in logs.
    pub fn kind(&self) -> &str {
        match self {
            RemoteEvent::Video(_) => "VIDEO",
            RemoteEvent::ClipboardReady => "CLIPBOARD_READY",
            RemoteEvent::ClipboardNewDataAvailable => "CLIPBOARD_NEW_DATA_AVAILABLE",
            RemoteEvent::ClipboardConsumed => "CLIPBOARD_CONSUMED",
            RemoteEvent::ClipboardDataText(_) => "CLIPBOARD_DATA_TXT",
            RemoteEvent::Other(kind) => kind,
        }
    }
}
