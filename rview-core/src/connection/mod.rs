//! Contract with the external connection collaborator.
//!
//! The remote-desktop protocol stack (handshake, encryption, codecs) is
//! not part of this crate. A stack plugs in by implementing
//! [`RemoteConnection`] and registering a [`Connector`] for its URL
//! schemes. Once connected it exposes two queues and a disconnect
//! signal:
//!
//! ```text
//!             commands (InputEvent)
//! bridge ───────────────────────────────► connection
//! bridge ◄─────────────────────────────── connection
//!             events (Result<RemoteEvent>)
//!             disconnected (CancellationToken)
//! ```

pub mod loopback;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::ViewerError;
use crate::protocol::{InputEvent, RemoteEvent};

pub use loopback::{LoopbackConnection, LoopbackConnector, LoopbackProbe};

/// Colour depths a session may negotiate.
pub const SUPPORTED_COLOR_DEPTHS: [u8; 4] = [15, 16, 24, 32];

/// Lowest colour depth offered to servers.
pub const MIN_COLOR_DEPTH: u8 = 15;

// ── Dialect ──────────────────────────────────────────────────────

/// Remote-desktop protocol variant of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Rdp,
    Vnc,
}

impl Dialect {
    /// Whether keystrokes must be sent as characters instead of scancodes.
    pub fn types_characters(self) -> bool {
        matches!(self, Dialect::Vnc)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Rdp => write!(f, "RDP"),
            Dialect::Vnc => write!(f, "VNC"),
        }
    }
}

// ── SessionTarget ────────────────────────────────────────────────

/// A parsed connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    url: Url,
    dialect: Dialect,
}

impl SessionTarget {
    /// Parse a connection URL such as `rdp+ntlm-password://host` or
    /// `vnc://host`. The dialect follows the scheme prefix; the rest of
    /// the scheme is left to the protocol stack.
    pub fn parse(raw: &str) -> Result<Self, ViewerError> {
        let url = Url::parse(raw)?;
        let scheme = url.scheme().to_ascii_lowercase();
        let dialect = if scheme.starts_with("rdp") {
            Dialect::Rdp
        } else if scheme.starts_with("vnc") || scheme.ends_with("+vnc") {
            Dialect::Vnc
        } else if scheme.starts_with("loopback") {
            Dialect::Rdp
        } else {
            return Err(ViewerError::UnsupportedScheme(scheme));
        };
        Ok(Self { url, dialect })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// ── ConnectionSettings ───────────────────────────────────────────

/// A virtual channel the protocol stack should forward to a local
/// listener (e.g. a SOCKS proxy channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelForward {
    /// Virtual channel name on the remote side.
    pub name: String,
    /// Local listen address.
    pub listen_ip: String,
    /// Local listen port.
    pub listen_port: u16,
}

/// Session parameters handed to the connection collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Desktop width in pixels.
    pub width: u32,
    /// Desktop height in pixels.
    pub height: u32,
    /// Lowest colour depth to offer.
    pub bpp_min: u8,
    /// Highest colour depth to offer.
    pub bpp_max: u8,
    /// Client keyboard layout short name (e.g. `enus`).
    pub keyboard_layout: String,
    /// Virtual channels to forward.
    pub channels: Vec<ChannelForward>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            bpp_min: MIN_COLOR_DEPTH,
            bpp_max: 32,
            keyboard_layout: "enus".into(),
            channels: Vec::new(),
        }
    }
}

impl ConnectionSettings {
    /// Check extents and colour depth.
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.width == 0 || self.height == 0 {
            return Err(ViewerError::InvalidResolution(format!(
                "{}x{}",
                self.width, self.height
            )));
        }
        if !SUPPORTED_COLOR_DEPTHS.contains(&self.bpp_max) {
            return Err(ViewerError::InvalidColorDepth(self.bpp_max));
        }
        Ok(())
    }
}

// ── RemoteConnection ─────────────────────────────────────────────

/// Queues and signal handed out by a connected session.
#[derive(Debug)]
pub struct SessionChannels {
    /// Command queue into the connection.
    pub commands: mpsc::UnboundedSender<InputEvent>,
    /// Event queue out of the connection. An `Err` item is a protocol or
    /// codec failure that ends the session.
    pub events: mpsc::UnboundedReceiver<Result<RemoteEvent, ViewerError>>,
    /// Cancelled when the remote side disconnects.
    pub disconnected: CancellationToken,
}

/// One remote-desktop session as provided by a protocol stack.
#[async_trait]
pub trait RemoteConnection: Send + 'static {
    /// Protocol variant of this session.
    fn dialect(&self) -> Dialect;

    /// Perform the handshake. Called once; there is no retry.
    async fn connect(&mut self) -> Result<SessionChannels, ViewerError>;

    /// Tear the session down. Must tolerate being called after the
    /// remote side already disconnected.
    async fn terminate(&mut self) -> Result<(), ViewerError>;
}

// ── Connectors ───────────────────────────────────────────────────

/// Factory for connections of one protocol stack.
pub trait Connector: Send + Sync {
    /// Whether this connector handles the URL scheme.
    fn handles(&self, scheme: &str) -> bool;

    /// Build an unconnected session for `target`.
    fn open(
        &self,
        target: &SessionTarget,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn RemoteConnection>, ViewerError>;
}

/// Scheme → connector lookup.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in loopback connector.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LoopbackConnector));
        registry
    }

    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    /// Open a connection with the first connector that handles the
    /// target's scheme.
    pub fn open(
        &self,
        target: &SessionTarget,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn RemoteConnection>, ViewerError> {
        settings.validate()?;
        let scheme = target.scheme().to_ascii_lowercase();
        let connector = self
            .connectors
            .iter()
            .find(|c| c.handles(&scheme))
            .ok_or_else(|| ViewerError::UnsupportedScheme(scheme.clone()))?;
        debug!("opening {} session via {scheme}", target.dialect());
        connector.open(target, settings)
    }
}

// ── Tests ────────────────────────────────────────────────────────
