//! Client façade.
//!
//! [`Client`] turns a command into a queued [`Request`] and waits for the
//! matched reply. It never touches the connection; the background
//! supervisor owns it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, SupervisorError};
use crate::mux::Inbox;
use crate::network::Dialer;
use crate::request::{ReplyResult, Request, RequestOptions};
use crate::state::{ConnectionPhase, ConnectionSlot};
use crate::supervisor::Supervisor;

// ── Client ───────────────────────────────────────────────────────

/// Handle for submitting console commands.
///
/// Cheap to clone; every clone feeds the same queue. Once all clones are
/// dropped the supervisor stops: right away while dialing or backing off,
/// otherwise after the multiplexer has drained the queue.
#[derive(Debug, Clone)]
pub struct Client {
    tx: mpsc::Sender<Request>,
    phase: watch::Receiver<ConnectionPhase>,
    cancel: CancellationToken,
    _release: Arc<DropGuard>,
}

impl Client {
    /// Start supervising a connection to `host` and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<D: Dialer>(
        dialer: D,
        host: impl Into<String>,
        password: impl Into<String>,
        config: ClientConfig,
    ) -> (Self, SupervisorHandle) {
        let host = host.into();
        debug!(host = %host, "creating RCON client");

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let slot = ConnectionSlot::new();
        let phase = slot.subscribe();
        let cancel = CancellationToken::new();
        let inbox = Inbox::new(rx);
        let release = Arc::new(inbox.release_guard());

        let supervisor = Supervisor::new(
            dialer,
            host,
            password.into(),
            config,
            slot,
            inbox,
            cancel.clone(),
        );
        let task = tokio::spawn(supervisor.run());

        let client = Self {
            tx,
            phase,
            cancel: cancel.clone(),
            _release: release,
        };
        (client, SupervisorHandle { task, cancel })
    }

    /// Queue `command` without waiting for its reply.
    ///
    /// Requests are written in the order they are queued.
    pub async fn submit(
        &self,
        command: impl Into<String>,
        options: RequestOptions,
    ) -> Result<PendingReply, ClientError> {
        let (req, rx) = Request::new(command, options);
        self.tx.send(req).await?;
        Ok(PendingReply { rx })
    }

    /// Run `command` and wait for the reply matched by correlation id.
    pub async fn execute(&self, command: impl Into<String>) -> Result<String, ClientError> {
        self.execute_with(command, RequestOptions::new()).await
    }

    /// Run `command` with options and wait for its reply.
    ///
    /// There is no deadline: while a reconnect is in progress this simply
    /// waits longer. See [`execute_timeout`](Self::execute_timeout).
    pub async fn execute_with(
        &self,
        command: impl Into<String>,
        options: RequestOptions,
    ) -> Result<String, ClientError> {
        self.submit(command, options).await?.wait().await
    }

    /// Like [`execute_with`](Self::execute_with), giving up after `limit`.
    ///
    /// A command already queued is still sent; its late reply is discarded.
    pub async fn execute_timeout(
        &self,
        command: impl Into<String>,
        options: RequestOptions,
        limit: Duration,
    ) -> Result<String, ClientError> {
        tokio::time::timeout(limit, self.execute_with(command, options))
            .await
            .map_err(|_| ClientError::Timeout(limit))?
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase.borrow().clone()
    }

    /// Receiver notified on every connection phase change.
    pub fn phase_watch(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.phase.borrow().is_connected()
    }

    /// Ask the supervisor to close the connection and stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── PendingReply ─────────────────────────────────────────────────

/// A queued command whose reply has not been awaited yet.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<ReplyResult>,
}

impl PendingReply {
    /// Wait for the reply; in-band `"error: "` payloads become
    /// [`ClientError::Remote`].
    pub async fn wait(self) -> Result<String, ClientError> {
        let payload = self.rx.await??;
        ClientError::check_payload(payload)
    }
}

// ── SupervisorHandle ─────────────────────────────────────────────

/// Owner's view of the background supervision task.
#[derive(Debug)]
pub struct SupervisorHandle {
    task: JoinHandle<Result<(), SupervisorError>>,
    cancel: CancellationToken,
}

impl SupervisorHandle {
    /// Wait for the supervisor to stop.
    ///
    /// `Ok(())` after a shutdown; an error when dialing failed fatally or the
    /// restart policy ran out.
    pub async fn wait(self) -> Result<(), SupervisorError> {
        self.task.await?
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
