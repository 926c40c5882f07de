//! Connection supervisor.
//!
//! Runs generations back to back: dial (retrying refused and timed-out
//! attempts with a fixed backoff), install the connection, run the
//! multiplexer to completion, close the connection, and consult the restart
//! policy before dialing again.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::SupervisorError;
use crate::mux::{GenerationEnd, Inbox, Multiplexer};
use crate::network::{Dialer, ErrorClass, classify};
use crate::state::ConnectionSlot;

pub struct Supervisor<D: Dialer> {
    dialer: D,
    host: String,
    password: String,
    config: ClientConfig,
    slot: ConnectionSlot<D::Conn>,
    inbox: Inbox,
    cancel: CancellationToken,
}

impl<D: Dialer> Supervisor<D> {
    pub fn new(
        dialer: D,
        host: String,
        password: String,
        config: ClientConfig,
        slot: ConnectionSlot<D::Conn>,
        inbox: Inbox,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dialer,
            host,
            password,
            config,
            slot,
            inbox,
            cancel,
        }
    }

    /// Supervise until shutdown or a fatal error.
    ///
    /// Requests still pending when this returns are answered with
    /// [`crate::ClientError::Closed`].
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let result = self.supervise().await;
        if let Err(e) = &result {
            error!(host = %self.host, error = %e, "RCON supervisor stopped");
        }
        self.inbox.close();
        result
    }

    async fn supervise(&mut self) -> Result<(), SupervisorError> {
        let mut generation = 0u64;
        let mut restarts = 0u32;

        loop {
            let Some(conn) = self.connect().await? else {
                return Ok(());
            };
            generation += 1;
            self.slot.install(conn, generation).await;
            info!(host = %self.host, generation, "RCON service connected");

            let mut mux = Multiplexer::new(
                &self.slot,
                &mut self.inbox,
                &self.config.keepalive,
                generation,
            );
            let end = mux.run(&self.cancel).await;
            let serviced = mux.serviced();
            let uptime = self.slot.phase().connected_duration().unwrap_or_default();
            self.slot.close().await;

            match &end {
                GenerationEnd::Shutdown => {
                    info!(host = %self.host, generation, ?uptime, "RCON client shut down");
                    return Ok(());
                }
                GenerationEnd::Failed(e) => {
                    warn!(
                        host = %self.host,
                        generation,
                        ?uptime,
                        serviced,
                        error = %e,
                        "polling quit with error"
                    )
                }
                other => info!(
                    host = %self.host,
                    generation,
                    ?uptime,
                    serviced,
                    reason = %other,
                    "RCON generation ended"
                ),
            }

            if serviced > 0 {
                restarts = 0;
            }
            let policy = self.config.supervisor.restart;
            if !policy.allows(restarts) {
                return Err(SupervisorError::RestartLimit { restarts });
            }
            restarts += 1;
            debug!(
                generation,
                restarts,
                carried = self.inbox.has_carried(),
                "restarting RCON connection"
            );
            if !self.pause(policy.delay()).await {
                return Ok(());
            }
        }
    }

    /// Dial until a connection is up. `Ok(None)` means shutdown was
    /// requested, or every client was dropped, while dialing.
    async fn connect(&mut self) -> Result<Option<D::Conn>, SupervisorError> {
        self.slot.begin_dial();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let dialed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                _ = self.inbox.released() => None,
                dialed = self.dialer.dial(&self.host, &self.password) => Some(dialed),
            };

            let e = match dialed {
                None => {
                    debug!(host = %self.host, "dialing stopped");
                    self.slot.abandon_dial();
                    return Ok(None);
                }
                Some(Ok(conn)) => return Ok(Some(conn)),
                Some(Err(e)) => e,
            };

            if classify(&e) != ErrorClass::Transient {
                warn!(host = %self.host, error = %e, "RCON service failed to connect");
                self.slot.abandon_dial();
                return Err(SupervisorError::Dial {
                    host: self.host.clone(),
                    source: e,
                });
            }

            debug!(host = %self.host, attempt = attempts, error = %e, "RCON service not reachable yet");
            if let Some(max) = self.config.connection.max_dial_attempts {
                if attempts >= max {
                    self.slot.abandon_dial();
                    return Err(SupervisorError::DialAttemptsExhausted {
                        host: self.host.clone(),
                        attempts,
                    });
                }
            }
            if !self.pause(self.config.connection.dial_backoff()).await {
                self.slot.abandon_dial();
                return Ok(None);
            }
        }
    }

    /// Sleep unless cancelled or released first. Returns `false` when the
    /// supervisor should stop.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled() && !self.inbox.is_released();
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.inbox.released() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
