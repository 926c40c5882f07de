//! Lock-guarded owner of the live connection handle.
//!
//! The supervisor installs and closes connections, the multiplexer borrows
//! the handle for each write/read step. Every access goes through the slot's
//! mutex; phase changes are published on a `watch` channel so observers
//! never contend with a pending read for the lock.

use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{error, warn};

use crate::network::Transport;
use crate::state::connection::{ConnectionPhase, PhaseError};

pub struct ConnectionSlot<C> {
    conn: Mutex<Option<C>>,
    phase: watch::Sender<ConnectionPhase>,
}

impl<C: Transport> Default for ConnectionSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Transport> ConnectionSlot<C> {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(ConnectionPhase::default());
        Self {
            conn: Mutex::new(None),
            phase,
        }
    }

    /// Snapshot of the current phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase.borrow().clone()
    }

    /// Subscribe to phase changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    pub fn begin_dial(&self) {
        self.transition(ConnectionPhase::begin_dial, ConnectionPhase::Dialing);
    }

    /// Leave `Dialing` without installing a connection.
    pub fn abandon_dial(&self) {
        self.transition(ConnectionPhase::finish_close, ConnectionPhase::Disconnected);
    }

    /// Install a freshly dialed connection, closing any previous one first.
    pub async fn install(&self, conn: C, generation: u64) {
        let mut guard = self.conn.lock().await;
        if let Some(mut previous) = guard.take() {
            warn!(generation, "replacing a connection that was still installed");
            if let Err(e) = previous.close().await {
                error!(error = %e, "error closing previous RCON connection");
            }
        }
        *guard = Some(conn);
        self.transition(
            |p| p.complete_dial(generation),
            ConnectionPhase::Connected {
                since: Instant::now(),
                generation,
            },
        );
    }

    /// Borrow the installed connection. `None` when nothing is installed.
    pub async fn lock(&self) -> MutexGuard<'_, Option<C>> {
        self.conn.lock().await
    }

    /// Close and clear the installed connection, if any.
    pub async fn close(&self) {
        self.transition(ConnectionPhase::begin_close, ConnectionPhase::Closing);
        let mut guard = self.conn.lock().await;
        if let Some(mut conn) = guard.take() {
            if let Err(e) = conn.close().await {
                error!(error = %e, "error closing RCON connection");
            }
        }
        drop(guard);
        self.transition(ConnectionPhase::finish_close, ConnectionPhase::Disconnected);
    }

    fn transition<F>(&self, step: F, fallback: ConnectionPhase)
    where
        F: FnOnce(&mut ConnectionPhase) -> Result<(), PhaseError>,
    {
        self.phase.send_modify(move |phase| {
            if let Err(e) = step(&mut *phase) {
                warn!(from = %phase, to = %fallback, "{e}");
                *phase = fallback;
            }
        });
    }
}
