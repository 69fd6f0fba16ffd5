//! Domain-specific error types for the viewer core.
//!
//! All fallible operations return `Result<T, ViewerError>`.
//! Malformed remote data and bad local input never panic; they either
//! surface as a typed error or are clipped/dropped and logged.

use std::path::PathBuf;

use thiserror::Error;

/// The canonical error type for the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    // ── Connection Errors ────────────────────────────────────────
    /// The connection collaborator failed to establish a session.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The connection reported a protocol or codec failure mid-session.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Tearing down the connection failed.
    #[error("terminate failed: {0}")]
    Terminate(String),

    /// No connector is registered for the URL scheme.
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    /// The target URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Session Errors ───────────────────────────────────────────
    /// A session state transition was not valid from the current state.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    /// The bridge thread or its runtime could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),

    // ── Script Errors ────────────────────────────────────────────
    /// A script line could not be parsed.
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },

    /// No keyboard layout is known under this short name.
    #[error("unknown keyboard layout: {0}")]
    UnknownLayout(String),

    /// A character has no key on the active layout.
    #[error("character {0:?} is not on the keyboard layout")]
    UnmappedChar(char),

    /// The script file could not be read.
    #[error("cannot read script {path}: {source}")]
    ScriptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration Errors ─────────────────────────────────────
    /// A resolution string was not `WIDTHxHEIGHT` with non-zero extents.
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    /// A colour depth outside {15, 16, 24, 32}.
    #[error("unsupported colour depth: {0}")]
    InvalidColorDepth(u8),

    // ── I/O ──────────────────────────────────────────────────────
    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for ViewerError {
    fn from(s: String) -> Self {
        ViewerError::Other(s)
    }
}

impl From<&str> for ViewerError {
    fn from(s: &str) -> Self {
        ViewerError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ViewerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ViewerError::ChannelClosed
    }
}

impl From<tokio::task::JoinError> for ViewerError {
    fn from(e: tokio::task::JoinError) -> Self {
        ViewerError::Runtime(format!("background task failed: {e}"))
    }
}

// ── Tests ────────────────────────────────────────────────────────
