//! Command submissions and their single-use reply channels.

use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::network::{CorrelationId, Reply};

/// What a request's reply channel carries.
pub type ReplyResult = Result<String, ClientError>;

/// Per-command options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    search: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the reply by substring instead of by correlation id.
    ///
    /// Useful for commands whose answer arrives under a different id, or is
    /// split over several messages.
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }
}

/// One in-flight command.
///
/// Consumed by [`respond`](Self::respond), so the reply channel can carry at
/// most one value.
#[derive(Debug)]
pub struct Request {
    command: String,
    search: Option<String>,
    reply_tx: oneshot::Sender<ReplyResult>,
}

impl Request {
    pub fn new(
        command: impl Into<String>,
        options: RequestOptions,
    ) -> (Self, oneshot::Receiver<ReplyResult>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let req = Self {
            command: command.into(),
            search: options.search,
            reply_tx,
        };
        (req, reply_rx)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Returns `true` if `reply` answers this request, which was written
    /// under `id`.
    pub fn matches(&self, reply: &Reply, id: CorrelationId) -> bool {
        reply.id == id
            || self
                .search
                .as_deref()
                .is_some_and(|query| reply.payload.contains(query))
    }

    /// Whether the caller stopped waiting for the reply.
    pub fn is_abandoned(&self) -> bool {
        self.reply_tx.is_closed()
    }

    /// Deliver the reply. Never blocks; a caller that gave up is ignored.
    pub fn respond(self, result: ReplyResult) {
        let _ = self.reply_tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_id() {
        let (req, _rx) = Request::new("status", RequestOptions::new());
        assert!(req.matches(&Reply::new(7, "server ok"), 7));
        assert!(!req.matches(&Reply::new(8, "server ok"), 7));
    }

    #[test]
    fn matches_by_search_substring() {
        let (req, _rx) = Request::new("listplayers", RequestOptions::new().search("Players"));
        assert_eq!(req.search(), Some("Players"));
        assert!(req.matches(&Reply::new(0, "3 Players connected"), 7));
        assert!(!req.matches(&Reply::new(0, "3 players connected"), 7));
        // id still matches
        assert!(req.matches(&Reply::new(7, "nothing"), 7));
    }

    #[tokio::test]
    async fn respond_delivers_once() {
        let (req, rx) = Request::new("status", RequestOptions::new());
        assert!(!req.is_abandoned());
        req.respond(Ok("ok".into()));
        assert_eq!(rx.await.unwrap(), Ok("ok".to_string()));
    }

    #[test]
    fn respond_to_abandoned_caller_does_not_block() {
        let (req, rx) = Request::new("status", RequestOptions::new());
        drop(rx);
        assert!(req.is_abandoned());
        req.respond(Ok("late".into()));
    }
}
