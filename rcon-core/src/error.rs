//! Domain-specific error types for the RCON client.
//!
//! Transport failures are classified and handled inside the supervisor and
//! multiplexer; only the variants below ever reach a caller. Connection loss
//! never panics.

use std::time::Duration;
use thiserror::Error;

/// Marker that prefixes an in-band error reply from the remote console.
pub const ERROR_MARKER: &str = "error: ";

// ── ClientError ──────────────────────────────────────────────────

/// Failure of a single command submitted through [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The remote console answered with an `"error: "`-prefixed payload.
    #[error("{0}")]
    Remote(String),

    /// The connection aborted while this command's reply was awaited.
    #[error("error: connection aborted while awaiting reply: {0}")]
    Aborted(String),

    /// A hard I/O failure occurred while this command was being serviced.
    #[error("error: transport failure: {0}")]
    Transport(String),

    /// The supervisor has stopped; the command cannot be serviced.
    #[error("client closed")]
    Closed,

    /// The caller-supplied deadline elapsed before a reply arrived.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Translate a reply payload into a result, honoring the in-band
    /// error marker.
    pub fn check_payload(payload: String) -> Result<String, ClientError> {
        if payload.starts_with(ERROR_MARKER) {
            Err(ClientError::Remote(payload))
        } else {
            Ok(payload)
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ClientError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ClientError::Closed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ClientError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        ClientError::Closed
    }
}

// ── SupervisorError ──────────────────────────────────────────────

/// Fatal condition that stopped the supervision task.
///
/// Delivered through [`crate::SupervisorHandle::wait`]; the owning process
/// decides whether to exit, alert, or spawn a fresh client.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Dialing failed with an error that is not expected during startup.
    #[error("failed to connect to {host}: {source}")]
    Dial {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Transient dial failures exceeded the configured attempt bound.
    #[error("gave up connecting to {host} after {attempts} attempts")]
    DialAttemptsExhausted { host: String, attempts: u32 },

    /// The restart policy does not allow another generation: `restarts`
    /// consecutive generations ended without answering a request.
    #[error("restart limit reached after {restarts} restarts")]
    RestartLimit { restarts: u32 },

    /// The supervision task panicked or was aborted.
    #[error("supervisor task failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for SupervisorError {
    fn from(e: tokio::task::JoinError) -> Self {
        SupervisorError::Join(e.to_string())
    }
}

// ── ConfigError ──────────────────────────────────────────────────

/// Failure loading or writing a [`crate::ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_prefix_is_a_remote_error() {
        let res = ClientError::check_payload("error: unknown command".to_string());
        assert_eq!(
            res,
            Err(ClientError::Remote("error: unknown command".to_string()))
        );
        assert!(res.unwrap_err().to_string().starts_with(ERROR_MARKER));
    }

    #[test]
    fn marker_elsewhere_is_not_an_error() {
        let payload = "players: 3 (last error: none)".to_string();
        assert_eq!(ClientError::check_payload(payload.clone()), Ok(payload));
    }

    #[test]
    fn error_display_messages() {
        let e = ClientError::Aborted("broken link".into());
        assert!(e.to_string().contains("broken link"));
        assert!(e.to_string().starts_with(ERROR_MARKER));

        let e = SupervisorError::RestartLimit { restarts: 3 };
        assert!(e.to_string().contains('3'));

        let e = SupervisorError::Dial {
            host: "10.0.0.1:27020".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("10.0.0.1:27020"));
    }

    #[tokio::test]
    async fn from_closed_channels() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let e: ClientError = tx.send(1).await.unwrap_err().into();
        assert_eq!(e, ClientError::Closed);

        let (tx, rx) = tokio::sync::oneshot::channel::<u8>();
        drop(tx);
        let e: ClientError = rx.await.unwrap_err().into();
        assert_eq!(e, ClientError::Closed);
    }
}
