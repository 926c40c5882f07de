use async_trait::async_trait;

/// Identifier assigned to a command by [`Transport::write`] and echoed by
/// the reply that answers it.
pub type CorrelationId = i32;

/// One message read from the remote console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub payload: String,
    pub id: CorrelationId,
}

impl Reply {
    pub fn new(id: CorrelationId, payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            id,
        }
    }
}

/// Establishes a new authenticated console session.
///
/// Implementations wrap the protocol codec (framing, length headers,
/// packet-id assignment); this crate never touches the wire format.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Conn: Transport;

    /// Dial `host` and authenticate with `password`.
    ///
    /// Refused and timed-out dials are retried by the supervisor, any other
    /// error stops it. See [`crate::network::classify`].
    async fn dial(&self, host: &str, password: &str) -> std::io::Result<Self::Conn>;
}

/// A live console session.
///
/// Only the multiplexer calls `write` and `read`, so implementations never
/// see concurrent calls.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send `command` and return the id its reply will carry.
    async fn write(&mut self, command: &str) -> std::io::Result<CorrelationId>;

    /// Read the next message.
    ///
    /// End-of-stream is reported as [`std::io::ErrorKind::UnexpectedEof`].
    /// Must be cancel-safe: the idle keepalive read is raced against a timer.
    async fn read(&mut self) -> std::io::Result<Reply>;

    /// Close the session. Failures are logged by the caller, never propagated.
    async fn close(&mut self) -> std::io::Result<()>;
}
