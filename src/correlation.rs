//! Request/response correlation.
//!
//! Every LISTEN/UNLISTEN request carries a fresh nonce; the server answers
//! with a RESPONSE frame echoing it. The table owns the set of in-flight
//! operations, keyed by nonce, and resolves each one exactly once: by the
//! matching RESPONSE, or by its deadline, whichever fires first. The loser
//! of that race finds the nonce gone and becomes a no-op.
//!
//! The table never touches the socket; it hands frames back to the session,
//! which is the only writer.

use std::collections::HashMap;
use std::time::Duration;

use pubsub_proto::{generate_nonce, OutboundFrame, ResponseError, Topic};
use tokio::sync::oneshot;
use tokio_util::time::delay_queue::{DelayQueue, Key};

use crate::error::OperationError;

/// What an operation does to the topic registry when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    /// Subscribe; confirmed topics join the active set.
    Listen,
    /// Unsubscribe; listed topics leave the active set.
    Unlisten,
}

/// Where an operation's outcome is reported.
pub(crate) enum OperationReply {
    /// A caller on the client handle is awaiting the outcome.
    Caller(oneshot::Sender<Result<(), OperationError>>),
    /// Issued internally (initial replay); outcomes surface as signals.
    Replay,
}

impl OperationReply {
    fn resolve(self, outcome: Result<(), OperationError>) {
        if let Self::Caller(sender) = self {
            // The caller may have gone away; that is not our problem.
            let _ = sender.send(outcome);
        }
    }
}

struct PendingOperation {
    kind: OperationKind,
    topics: Vec<Topic>,
    reply: OperationReply,
    deadline: Key,
}

/// A resolved operation, returned to the session so it can update the
/// registry and report bootstrap outcomes.
pub(crate) struct Resolution {
    pub kind: OperationKind,
    pub topics: Vec<Topic>,
    pub outcome: Result<(), OperationError>,
    /// True when no caller was awaiting this operation (internal replay);
    /// failures then surface only as signals.
    pub background: bool,
}

/// The in-flight operation table for one session.
pub(crate) struct CorrelationTable {
    pending: HashMap<String, PendingOperation>,
    deadlines: DelayQueue<String>,
    timeout: Duration,
}

impl CorrelationTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            deadlines: DelayQueue::new(),
            timeout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Register a new operation and build the frame that requests it.
    ///
    /// The deadline is armed here; the caller must actually send the frame.
    pub fn issue(
        &mut self,
        kind: OperationKind,
        topics: Vec<Topic>,
        reply: OperationReply,
    ) -> (String, OutboundFrame) {
        let nonce = generate_nonce();
        let frame = match kind {
            OperationKind::Listen => OutboundFrame::listen(&nonce, &topics),
            OperationKind::Unlisten => OutboundFrame::unlisten(&nonce, &topics),
        };
        let deadline = self.deadlines.insert(nonce.clone(), self.timeout);
        self.pending.insert(
            nonce.clone(),
            PendingOperation {
                kind,
                topics,
                reply,
                deadline,
            },
        );
        (nonce, frame)
    }

    /// Resolve the operation a RESPONSE frame acknowledges.
    ///
    /// Returns `None` for unknown nonces - already resolved, timed out, or
    /// fabricated - which the session reports as an anomaly.
    pub fn complete(&mut self, nonce: &str, error: Option<ResponseError>) -> Option<Resolution> {
        let op = self.pending.remove(nonce)?;
        self.deadlines.try_remove(&op.deadline);
        let background = matches!(op.reply, OperationReply::Replay);
        let outcome = match error {
            None => Ok(()),
            Some(code) => Err(OperationError::Rejected(code)),
        };
        op.reply.resolve(outcome.clone());
        Some(Resolution {
            kind: op.kind,
            topics: op.topics,
            outcome,
            background,
        })
    }

    /// Resolve an operation whose deadline fired with a timeout failure.
    ///
    /// A nonce that raced with a RESPONSE and lost is already gone; that is
    /// a no-op, not an error.
    pub fn expire(&mut self, nonce: &str) -> Option<Resolution> {
        let op = self.pending.remove(nonce)?;
        let background = matches!(op.reply, OperationReply::Replay);
        let outcome = Err(OperationError::Timeout);
        op.reply.resolve(outcome.clone());
        Some(Resolution {
            kind: op.kind,
            topics: op.topics,
            outcome,
            background,
        })
    }

    /// The next expired nonce, once one exists.
    ///
    /// Pends forever while the table is empty; the session's select loop
    /// recreates this future every iteration, so operations inserted later
    /// are picked up.
    pub async fn next_expired(&mut self) -> String {
        match futures_util::future::poll_fn(|cx| self.deadlines.poll_expired(cx)).await {
            Some(expired) => expired.into_inner(),
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(names: &[&str]) -> Vec<Topic> {
        names.iter().map(|name| Topic::new(*name)).collect()
    }

    #[tokio::test]
    async fn complete_resolves_the_caller() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        let (tx, rx) = oneshot::channel();
        let (nonce, frame) = table.issue(
            OperationKind::Listen,
            topics(&["video-playback.1"]),
            OperationReply::Caller(tx),
        );
        assert_eq!(frame.nonce(), Some(nonce.as_str()));

        let resolution = table.complete(&nonce, None).expect("operation is pending");
        assert_eq!(resolution.kind, OperationKind::Listen);
        assert_eq!(resolution.outcome, Ok(()));
        assert_eq!(rx.await.unwrap(), Ok(()));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn server_error_rejects_the_caller() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        let (tx, rx) = oneshot::channel();
        let (nonce, _) = table.issue(
            OperationKind::Listen,
            topics(&["whispers.1"]),
            OperationReply::Caller(tx),
        );

        let resolution = table
            .complete(&nonce, Some(ResponseError::BadAuth))
            .expect("operation is pending");
        assert_eq!(
            resolution.outcome,
            Err(OperationError::Rejected(ResponseError::BadAuth))
        );
        assert_eq!(
            rx.await.unwrap(),
            Err(OperationError::Rejected(ResponseError::BadAuth))
        );
    }

    #[tokio::test]
    async fn unknown_nonce_is_a_no_op() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        assert!(table.complete("never-issued", None).is_none());
    }

    #[tokio::test]
    async fn resolution_is_at_most_once() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        let (tx, _rx) = oneshot::channel();
        let (nonce, _) = table.issue(
            OperationKind::Unlisten,
            topics(&["whispers.1"]),
            OperationReply::Caller(tx),
        );

        assert!(table.complete(&nonce, None).is_some());
        assert!(table.complete(&nonce, None).is_none());
        assert!(table.expire(&nonce).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_the_operation_out_exactly_once() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        let (tx, rx) = oneshot::channel();
        let (nonce, _) = table.issue(
            OperationKind::Listen,
            topics(&["video-playback.1"]),
            OperationReply::Caller(tx),
        );

        let expired = table.next_expired().await;
        assert_eq!(expired, nonce);

        let resolution = table.expire(&expired).expect("still pending");
        assert_eq!(resolution.outcome, Err(OperationError::Timeout));
        assert_eq!(rx.await.unwrap(), Err(OperationError::Timeout));

        // A response arriving microseconds after the timeout is discarded.
        assert!(table.complete(&nonce, None).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn operations_resolve_independently_and_out_of_order() {
        let mut table = CorrelationTable::new(Duration::from_secs(10));
        let (tx1, rx1) = oneshot::channel();
        let (nonce1, _) = table.issue(
            OperationKind::Listen,
            topics(&["video-playback.1"]),
            OperationReply::Caller(tx1),
        );
        let (tx2, rx2) = oneshot::channel();
        let (nonce2, _) = table.issue(
            OperationKind::Listen,
            topics(&["whispers.2"]),
            OperationReply::Caller(tx2),
        );
        assert_ne!(nonce1, nonce2);

        // The second request is acknowledged first.
        assert!(table.complete(&nonce2, None).is_some());
        assert!(table
            .complete(&nonce1, Some(ResponseError::Server))
            .is_some());

        assert_eq!(rx2.await.unwrap(), Ok(()));
        assert_eq!(
            rx1.await.unwrap(),
            Err(OperationError::Rejected(ResponseError::Server))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn next_expired_pends_while_empty() {
        let mut table = CorrelationTable::new(Duration::from_millis(50));
        let wait = tokio::time::timeout(Duration::from_millis(10), table.next_expired()).await;
        assert!(wait.is_err(), "empty table must not yield an expiry");
    }
}
