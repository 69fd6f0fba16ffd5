//! # rview-core
//!
//! Interface bridge for a remote desktop viewer.
//!
//! This crate contains:
//! - **Display**: `Framebuffer` compositor patched by `DisplayPatch` rectangles
//! - **Protocol**: `InputEvent` commands and `RemoteEvent` events exchanged with a connection
//! - **Input**: `KeyEncoder` / `MouseEncoder` for local input, `RepeatTrigger` hot-key detector
//! - **Connection**: the `RemoteConnection` contract, `ConnectorRegistry` and the loopback session
//! - **Bridge**: `RuntimeBridge`, the single-threaded async runtime driving one session
//! - **Script**: keystroke script reader and `ScriptInjector`
//! - **Session**: `SessionState` lifecycle machine
//! - **Error**: `ViewerError`, a typed `thiserror`-based error hierarchy

pub mod bridge;
pub mod connection;
pub mod display;
pub mod error;
pub mod input;
pub mod protocol;
pub mod script;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bridge::{BridgeEvent, ChannelSink, EventSink, RuntimeBridge};
pub use connection::{
    ChannelForward, ConnectionSettings, Connector, ConnectorRegistry, Dialect, LoopbackConnection,
    LoopbackProbe, RemoteConnection, SessionChannels, SessionTarget,
};
pub use display::{DisplayPatch, Framebuffer, PixelFormat, Rect};
pub use error::ViewerError;
pub use input::{ClipboardSource, KeyEncoder, KeyId, LocalButton, LocalKey, MouseEncoder, RepeatTrigger};
pub use protocol::{InputEvent, ModifierSet, RemoteEvent};
pub use script::{ScriptInjector, ScriptSettings};
pub use session::SessionState;
