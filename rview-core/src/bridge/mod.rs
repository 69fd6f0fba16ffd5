//! Bridge between the connection's async runtime and the presentation
//! thread.

pub mod runtime;
pub mod sink;

pub use runtime::RuntimeBridge;
pub use sink::{BridgeEvent, ChannelSink, EventSink};
