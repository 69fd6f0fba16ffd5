//! Session lifecycle state machine.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::ViewerError;

// ── SessionState ─────────────────────────────────────────────────

/// The lifecycle phase of one remote session.
///
/// ```text
///  Starting ──► Connected ──► Stopping ──► Terminated
///      │                                       ▲
///      └──────────── (connect failed) ─────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connection attempt in progress. Initial state.
    #[default]
    Starting,

    /// Handshake complete; both pumps are running.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Teardown requested by either side; waiting for the pumps and the
    /// connection to confirm.
    Stopping,

    /// Connection released. Terminal state.
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// How long the session has been connected, `None` in other phases.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Handshake succeeded.
    ///
    /// Valid from: `Starting`.
    pub fn connect_established(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Starting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(ViewerError::InvalidTransition(
                "cannot connect: not in Starting state",
            )),
        }
    }

    /// Handshake failed; no retry.
    ///
    /// Valid from: `Starting`.
    pub fn connect_failed(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Starting => {
                *self = Self::Terminated;
                Ok(())
            }
            _ => Err(ViewerError::InvalidTransition(
                "cannot fail connect: not in Starting state",
            )),
        }
    }

    /// Local close, remote disconnect or explicit stop.
    ///
    /// Valid from: `Connected`.
    pub fn begin_stop(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(ViewerError::InvalidTransition(
                "cannot stop: not in Connected state",
            )),
        }
    }

    /// Pumps and connection confirmed teardown.
    ///
    /// Valid from: `Stopping`.
    pub fn finish_stop(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Stopping => {
                *self = Self::Terminated;
                Ok(())
            }
            _ => Err(ViewerError::InvalidTransition(
                "cannot finish stop: not in Stopping state",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
