//! Wire frames exchanged with the PubSub endpoint.
//!
//! Everything on the socket is a small JSON object discriminated by a
//! `type` field. Outbound there are exactly three kinds (`PING`, `LISTEN`,
//! `UNLISTEN`); inbound there are four (`PONG`, `RECONNECT`, `RESPONSE`,
//! `MESSAGE`). The `message` field of a `MESSAGE` frame is frequently a
//! JSON document re-encoded as a string and needs a second decode pass,
//! which happens here so downstream code always sees structured data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FrameError, ResponseError};
use crate::topic::Topic;

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Keepalive probe.
    Ping,
    /// Subscribe to topics, correlated by `nonce`.
    Listen {
        /// Correlation nonce echoed back in the matching `RESPONSE`.
        nonce: String,
        /// Topic names to subscribe to.
        topics: Vec<String>,
        /// Authorization token covering the listed topics, if any.
        auth_token: Option<String>,
    },
    /// Unsubscribe from topics, correlated by `nonce`.
    Unlisten {
        /// Correlation nonce echoed back in the matching `RESPONSE`.
        nonce: String,
        /// Topic names to unsubscribe from.
        topics: Vec<String>,
    },
}

#[derive(Serialize)]
struct WireOut<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WireOutData<'a>>,
}

#[derive(Serialize)]
struct WireOutData<'a> {
    topics: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_token: Option<&'a str>,
}

impl OutboundFrame {
    /// Build a `LISTEN` frame for a batch of topics.
    ///
    /// The wire format carries a single `auth_token` per request; the first
    /// token found among the topics is used and is expected to cover the
    /// whole batch.
    pub fn listen(nonce: impl Into<String>, topics: &[Topic]) -> Self {
        Self::Listen {
            nonce: nonce.into(),
            topics: topics.iter().map(|t| t.name().to_string()).collect(),
            auth_token: topics
                .iter()
                .find_map(|t| t.auth_token())
                .map(str::to_string),
        }
    }

    /// Build an `UNLISTEN` frame for a batch of topics.
    pub fn unlisten(nonce: impl Into<String>, topics: &[Topic]) -> Self {
        Self::Unlisten {
            nonce: nonce.into(),
            topics: topics.iter().map(|t| t.name().to_string()).collect(),
        }
    }

    /// The correlation nonce, if this frame kind carries one.
    pub fn nonce(&self) -> Option<&str> {
        match self {
            Self::Ping => None,
            Self::Listen { nonce, .. } | Self::Unlisten { nonce, .. } => Some(nonce),
        }
    }

    /// Serialize to the JSON text sent on the socket.
    pub fn encode(&self) -> Result<String, FrameError> {
        let wire = match self {
            Self::Ping => WireOut {
                kind: "PING",
                nonce: None,
                data: None,
            },
            Self::Listen {
                nonce,
                topics,
                auth_token,
            } => WireOut {
                kind: "LISTEN",
                nonce: Some(nonce),
                data: Some(WireOutData {
                    topics,
                    auth_token: auth_token.as_deref(),
                }),
            },
            Self::Unlisten { nonce, topics } => WireOut {
                kind: "UNLISTEN",
                nonce: Some(nonce),
                data: Some(WireOutData {
                    topics,
                    auth_token: None,
                }),
            },
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

/// A `RESPONSE` frame: the server's acknowledgment of a `LISTEN` or
/// `UNLISTEN` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The nonce of the request being acknowledged.
    pub nonce: String,
    /// `None` on success, otherwise the server's error code.
    pub error: Option<ResponseError>,
}

/// A `MESSAGE` frame: one published payload on one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    /// The topic the payload was published on.
    pub topic: String,
    /// The payload, already through the second decode pass.
    pub payload: Value,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keepalive acknowledgment.
    Pong,
    /// The server is about to restart; clients should reconnect.
    Reconnect,
    /// Acknowledgment of a pending request.
    Response(Response),
    /// A published payload.
    Message(TopicMessage),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    message: Option<Value>,
}

impl InboundFrame {
    /// Decode one raw inbound frame.
    ///
    /// Unknown `type` values are an explicit error so the session can report
    /// them; they must not be silently conflated with decodable frames.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        match envelope.kind.as_str() {
            "PONG" => Ok(Self::Pong),
            "RECONNECT" => Ok(Self::Reconnect),
            "RESPONSE" => {
                let nonce = envelope.nonce.ok_or(FrameError::MissingField {
                    frame: "RESPONSE",
                    field: "nonce",
                })?;
                let error = match envelope.error.as_deref() {
                    None | Some("") => None,
                    Some(code) => Some(ResponseError::from_code(code)),
                };
                Ok(Self::Response(Response { nonce, error }))
            }
            "MESSAGE" => {
                let data = envelope.data.ok_or(FrameError::MissingField {
                    frame: "MESSAGE",
                    field: "data",
                })?;
                let topic = data.topic.ok_or(FrameError::MissingField {
                    frame: "MESSAGE",
                    field: "data.topic",
                })?;
                let message = data.message.ok_or(FrameError::MissingField {
                    frame: "MESSAGE",
                    field: "data.message",
                })?;
                Ok(Self::Message(TopicMessage {
                    topic,
                    payload: second_pass(message)?,
                }))
            }
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

/// Re-decode a payload that arrived as a JSON-encoded string.
fn second_pass(value: Value) -> Result<Value, FrameError> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        structured => Ok(structured),
    }
}
