//! Connection lifecycle state machine.
//!
//! `ConnectionPhase` models one client's view of its console link across
//! generations, with validated transitions that return `Result` instead of
//! panicking.

use std::time::Instant;

use thiserror::Error;

/// Rejected phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {0}")]
pub struct PhaseError(&'static str);

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the console link.
///
/// ```text
///  Disconnected ──► Dialing ──► Connected ──► Closing
///       ▲              │                         │
///       └──────────────┴─────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No live connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// Dial attempts (and transient-failure backoff) in progress.
    Dialing,

    /// A connection is installed and the multiplexer owns it.
    Connected {
        /// When the connection was installed.
        since: Instant,
        /// Generation counter, starting at 1 for the first connection.
        generation: u64,
    },

    /// The multiplexer has exited; the connection is being closed.
    Closing,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Dialing => write!(f, "Dialing"),
            Self::Connected { generation, .. } => write!(f, "Connected (generation {generation})"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl ConnectionPhase {
    /// Returns `true` when a connection is installed.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// The generation of the installed connection, if any.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Connected { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// How long the current connection has been installed.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Dialing`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_dial(&mut self) -> Result<(), PhaseError> {
        match self {
            Self::Disconnected => {
                *self = Self::Dialing;
                Ok(())
            }
            _ => Err(PhaseError("cannot dial: not in Disconnected state")),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Dialing`.
    pub fn complete_dial(&mut self, generation: u64) -> Result<(), PhaseError> {
        match self {
            Self::Dialing => {
                *self = Self::Connected {
                    since: Instant::now(),
                    generation,
                };
                Ok(())
            }
            _ => Err(PhaseError("cannot complete dial: not in Dialing state")),
        }
    }

    /// Transition to `Closing`.
    ///
    /// Valid from: `Connected`.
    pub fn begin_close(&mut self) -> Result<(), PhaseError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(PhaseError("cannot close: not in Connected state")),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Closing`, `Dialing` (fatal dial error or shutdown).
    pub fn finish_close(&mut self) -> Result<(), PhaseError> {
        match self {
            Self::Closing | Self::Dialing => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(PhaseError("cannot finish close: not in Closing or Dialing state")),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
