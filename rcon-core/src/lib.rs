//! # rcon-core
//!
//! Resilient client for RCON-style remote administrative consoles.
//!
//! One background task owns the single live connection and runs it in
//! generations: dial, multiplex commands until the link is lost, close,
//! redial. Any number of callers submit commands concurrently through a
//! cloneable [`Client`]; each gets exactly one reply.
//!
//! This crate contains:
//! - **Network**: `Dialer` / `Transport` capability traits over an external
//!   protocol codec, plus portable transport error classification
//! - **State**: `ConnectionPhase` lifecycle and the lock-guarded `ConnectionSlot`
//! - **Request**: `Request`, `RequestOptions` and correlation matching
//! - **Mux**: the single-actor request multiplexer with keepalive polling
//! - **Supervisor**: dial/backoff, generation restarts and restart policy
//! - **Client**: the public façade (`Client`, `PendingReply`, `SupervisorHandle`)
//! - **Config**: `ClientConfig`, loadable from TOML
//! - **Error**: `ClientError`, `SupervisorError`, `ConfigError`

pub mod client;
pub mod config;
pub mod error;
mod mux;
pub mod network;
pub mod request;
pub mod state;
mod supervisor;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{Client, PendingReply, SupervisorHandle};
pub use config::{ClientConfig, ConnectionConfig, KeepaliveConfig, RestartPolicy, SupervisorConfig};
pub use error::{ClientError, ConfigError, ERROR_MARKER, SupervisorError};
pub use network::{CorrelationId, Dialer, ErrorClass, Reply, Transport};
pub use request::{RequestOptions, ReplyResult};
pub use state::ConnectionPhase;
