//! Unified error handling for the client.
//!
//! Two shapes of failure leave this crate: rejected outcomes on awaited
//! operations ([`OperationError`]) and non-fatal anomaly signals on the
//! event stream ([`ErrorEvent`]). Normal network instability never panics
//! and never kills the session.

use std::fmt;

use pubsub_proto::ResponseError;
use thiserror::Error;

/// Why a listen/unlisten operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The server acknowledged the request with an error code.
    #[error("server rejected request: {0}")]
    Rejected(ResponseError),

    /// No acknowledgment arrived within the operation deadline.
    #[error("no response within the operation deadline")]
    Timeout,

    /// The session ended before the operation resolved.
    #[error("session closed before the operation resolved")]
    SessionClosed,
}

impl OperationError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Timeout => "timeout",
            Self::SessionClosed => "session_closed",
        }
    }
}

/// Where an anomaly was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Dialing the endpoint failed.
    Connect,
    /// An inbound frame failed to decode.
    Frame,
    /// A RESPONSE frame referenced no pending operation, or an operation
    /// was rejected with no caller awaiting it.
    Response,
    /// A known topic family's payload failed to decode.
    Classifier,
    /// The initial topic replay was rejected.
    Bootstrap,
    /// The transport reported an error.
    Socket,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Frame => "frame",
            Self::Response => "response",
            Self::Classifier => "classifier",
            Self::Bootstrap => "bootstrap",
            Self::Socket => "socket",
        };
        f.write_str(label)
    }
}

/// A non-fatal anomaly surfaced on the event stream.
///
/// These report; they never by themselves change connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Where the anomaly was detected.
    pub origin: ErrorOrigin,
    /// Human-readable detail.
    pub detail: String,
    /// The topic involved, when one is known.
    pub topic: Option<String>,
}

impl ErrorEvent {
    pub(crate) fn new(origin: ErrorOrigin, detail: impl Into<String>) -> Self {
        Self {
            origin,
            detail: detail.into(),
            topic: None,
        }
    }

    pub(crate) fn with_topic(
        origin: ErrorOrigin,
        detail: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            origin,
            detail: detail.into(),
            topic: Some(topic.into()),
        }
    }
}
