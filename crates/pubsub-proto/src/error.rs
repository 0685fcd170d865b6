//! Error types for the PubSub protocol library.
//!
//! Two layers of failure live here: machine-readable error codes the server
//! attaches to `RESPONSE` frames, and local decode failures for inbound
//! frames. Both are reported, never fatal to a connection.

use std::fmt;

use thiserror::Error;

/// Machine-readable error codes carried by `RESPONSE` frames.
///
/// An empty `error` field on the wire means success and never constructs
/// one of these. Codes the server may add later are preserved verbatim in
/// [`ResponseError::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The request frame was malformed.
    BadMessage,
    /// The supplied auth token was rejected.
    BadAuth,
    /// The server failed internally.
    Server,
    /// The named topic does not exist or is not listenable.
    BadTopic,
    /// An unrecognized code, preserved as received.
    Other(String),
}

impl ResponseError {
    /// Parse a non-empty wire code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ERR_BADMESSAGE" => Self::BadMessage,
            "ERR_BADAUTH" => Self::BadAuth,
            "ERR_SERVER" => Self::Server,
            "ERR_BADTOPIC" => Self::BadTopic,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire representation of this code.
    pub fn code(&self) -> &str {
        match self {
            Self::BadMessage => "ERR_BADMESSAGE",
            Self::BadAuth => "ERR_BADAUTH",
            Self::Server => "ERR_SERVER",
            Self::BadTopic => "ERR_BADTOPIC",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for ResponseError {}

/// Failures decoding a raw inbound frame.
///
/// These are caught at the frame boundary and reported; a malformed frame
/// never terminates the processing sequence.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The frame (or a string-encoded inner payload) was not valid JSON.
    #[error("invalid frame json: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` field named a frame kind this client does not know.
    #[error("unknown frame type: {0}")]
    UnknownType(String),

    /// A known frame kind was missing a required field.
    #[error("{frame} frame missing `{field}`")]
    MissingField {
        /// The frame kind being decoded.
        frame: &'static str,
        /// The absent field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in ["ERR_BADMESSAGE", "ERR_BADAUTH", "ERR_SERVER", "ERR_BADTOPIC"] {
            let err = ResponseError::from_code(code);
            assert!(!matches!(err, ResponseError::Other(_)), "{code} should be known");
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn unknown_code_preserved() {
        let err = ResponseError::from_code("ERR_FUTURE");
        assert_eq!(err, ResponseError::Other("ERR_FUTURE".to_string()));
        assert_eq!(err.code(), "ERR_FUTURE");
        assert_eq!(err.to_string(), "ERR_FUTURE");
    }
}
