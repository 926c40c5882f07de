//! Request multiplexer.
//!
//! One multiplexer runs per connection generation and is the only code that
//! calls `write`/`read` on the transport. It alternates between waiting for
//! the next request and polling the idle link, and services requests one at
//! a time:
//!
//! ```text
//!            ┌──── tick: keepalive read ────┐
//!            ▼                              │
//!          Idle ──── request ──► Writing ──► AwaitingMatch
//!            ▲                      │            │
//!            │                      ▼            ▼
//!            └────── matched ─── Closed ◄── abort / error / eof
//! ```

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, warn};

use crate::config::KeepaliveConfig;
use crate::error::ClientError;
use crate::network::{ErrorClass, Transport, classify, is_end_of_stream};
use crate::request::Request;
use crate::state::ConnectionSlot;

// ── GenerationEnd ────────────────────────────────────────────────

/// Why a multiplexer generation stopped.
#[derive(Debug)]
pub enum GenerationEnd {
    /// Cancelled, or every client handle was dropped.
    Shutdown,
    /// The peer closed the stream.
    EndOfStream,
    /// The connection was aborted mid-operation.
    Aborted,
    /// A hard I/O error.
    Failed(std::io::Error),
}

impl fmt::Display for GenerationEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::EndOfStream => write!(f, "end of stream"),
            Self::Aborted => write!(f, "connection aborted"),
            Self::Failed(e) => write!(f, "I/O error: {e}"),
        }
    }
}

// ── Inbox ────────────────────────────────────────────────────────

/// The inbound request queue, plus the request carried over from an aborted
/// generation. The carried request is always serviced before the queue.
///
/// `released` fires once every client handle holding a [`release_guard`]
/// is gone, so the supervisor can stop while no multiplexer is reading the
/// queue.
///
/// [`release_guard`]: Inbox::release_guard
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Request>,
    carried: Option<Request>,
    released: CancellationToken,
}

impl Inbox {
    pub fn new(rx: mpsc::Receiver<Request>) -> Self {
        Self {
            rx,
            carried: None,
            released: CancellationToken::new(),
        }
    }

    /// Guard that marks the inbox released when dropped.
    pub fn release_guard(&self) -> DropGuard {
        self.released.clone().drop_guard()
    }

    /// Resolves once every client handle has been dropped.
    pub async fn released(&self) {
        self.released.cancelled().await
    }

    pub fn is_released(&self) -> bool {
        self.released.is_cancelled()
    }

    pub fn has_carried(&self) -> bool {
        self.carried.is_some()
    }

    /// Stop accepting requests and answer everything pending with
    /// [`ClientError::Closed`].
    pub fn close(&mut self) {
        self.rx.close();
        if let Some(req) = self.carried.take() {
            req.respond(Err(ClientError::Closed));
        }
        while let Ok(req) = self.rx.try_recv() {
            req.respond(Err(ClientError::Closed));
        }
    }
}

// ── Multiplexer ──────────────────────────────────────────────────

enum Event {
    Cancelled,
    Request(Option<Request>),
    Tick,
}

pub struct Multiplexer<'a, C> {
    slot: &'a ConnectionSlot<C>,
    inbox: &'a mut Inbox,
    keepalive: &'a KeepaliveConfig,
    generation: u64,
    serviced: u64,
}

impl<'a, C: Transport> Multiplexer<'a, C> {
    pub fn new(
        slot: &'a ConnectionSlot<C>,
        inbox: &'a mut Inbox,
        keepalive: &'a KeepaliveConfig,
        generation: u64,
    ) -> Self {
        Self {
            slot,
            inbox,
            keepalive,
            generation,
            serviced: 0,
        }
    }

    /// Requests answered with a matched reply so far.
    pub fn serviced(&self) -> u64 {
        self.serviced
    }

    /// Run until the generation ends.
    pub async fn run(&mut self, cancel: &CancellationToken) -> GenerationEnd {
        let mut ticker = interval(self.keepalive.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.reset();

        loop {
            if let Some(req) = self.inbox.carried.take() {
                debug!(
                    generation = self.generation,
                    rcon_request = req.command(),
                    "retrying carried-over request"
                );
                if let Some(end) = self.service(req, cancel).await {
                    return end;
                }
                continue;
            }

            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                next = self.inbox.rx.recv() => Event::Request(next),
                _ = ticker.tick() => Event::Tick,
            };

            let end = match event {
                Event::Cancelled | Event::Request(None) => Some(GenerationEnd::Shutdown),
                Event::Request(Some(req)) => self.service(req, cancel).await,
                Event::Tick => self.poll().await,
            };
            if let Some(end) = end {
                return end;
            }
        }
    }

    /// Write one request and read until its reply arrives.
    ///
    /// Returns `None` once the request is answered and the link is still
    /// usable.
    async fn service(&mut self, req: Request, cancel: &CancellationToken) -> Option<GenerationEnd> {
        let generation = self.generation;
        let slot = self.slot;
        let mut guard = slot.lock().await;
        let Some(conn) = guard.as_mut() else {
            warn!(generation, "no connection installed; carrying request over");
            self.inbox.carried = Some(req);
            return Some(GenerationEnd::Aborted);
        };

        let id = match conn.write(req.command()).await {
            Ok(id) => id,
            Err(e) if classify(&e) == ErrorClass::Aborted => {
                debug!(
                    generation,
                    rcon_request = req.command(),
                    error = %e,
                    "connection aborted during write; request carried over"
                );
                self.inbox.carried = Some(req);
                return Some(GenerationEnd::Aborted);
            }
            Err(e) => {
                error!(
                    generation,
                    rcon_request = req.command(),
                    search = req.search(),
                    error = %e,
                    "failed to write an RCON command"
                );
                req.respond(Err(ClientError::Transport(e.to_string())));
                return Some(GenerationEnd::Failed(e));
            }
        };

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                read = conn.read() => Some(read),
            };

            match read {
                None => {
                    req.respond(Err(ClientError::Closed));
                    return Some(GenerationEnd::Shutdown);
                }
                Some(Ok(reply)) => {
                    debug!(
                        generation,
                        rcon_request = req.command(),
                        search = req.search(),
                        reply_id = reply.id,
                        rcon_message = %reply.payload,
                        "rcon message"
                    );
                    if req.matches(&reply, id) {
                        if req.is_abandoned() {
                            debug!(generation, rcon_request = req.command(), "caller stopped waiting");
                        }
                        req.respond(Ok(reply.payload));
                        self.serviced += 1;
                        return None;
                    }
                }
                Some(Err(e)) if is_end_of_stream(&e) || classify(&e) == ErrorClass::Aborted => {
                    debug!(
                        generation,
                        rcon_request = req.command(),
                        error = %e,
                        "connection lost while awaiting reply"
                    );
                    req.respond(Err(ClientError::Aborted(e.to_string())));
                    return Some(if is_end_of_stream(&e) {
                        GenerationEnd::EndOfStream
                    } else {
                        GenerationEnd::Aborted
                    });
                }
                Some(Err(e)) => {
                    error!(
                        generation,
                        rcon_request = req.command(),
                        search = req.search(),
                        error = %e,
                        "failed to read an RCON message"
                    );
                    req.respond(Err(ClientError::Transport(e.to_string())));
                    return Some(GenerationEnd::Failed(e));
                }
            }
        }
    }

    /// Idle keepalive: one bounded read, discarding whatever arrives.
    async fn poll(&mut self) -> Option<GenerationEnd> {
        let generation = self.generation;
        let mut guard = self.slot.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Some(GenerationEnd::Aborted);
        };

        match timeout(self.keepalive.read_timeout(), conn.read()).await {
            Err(_) => None,
            Ok(Ok(reply)) => {
                debug!(generation, rcon_message = %reply.payload, "rcon polling to keepalive");
                None
            }
            Ok(Err(e)) if is_end_of_stream(&e) => {
                debug!(generation, "RCON stream closed by peer");
                Some(GenerationEnd::EndOfStream)
            }
            Ok(Err(e)) if classify(&e) == ErrorClass::Aborted => {
                debug!(generation, error = %e, "connection aborted during keepalive");
                Some(GenerationEnd::Aborted)
            }
            Ok(Err(e)) => {
                error!(generation, error = %e, "keepalive read failed");
                Some(GenerationEnd::Failed(e))
            }
        }
    }
}
