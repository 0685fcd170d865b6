//! Decoding for `whispers` payloads.
//!
//! Whisper payloads are the messiest in the protocol: the interesting
//! fields live in a `data_object`, the sender's id sits in a sibling `data`
//! blob, and both `tags` and `recipient` sometimes arrive as JSON re-encoded
//! strings needing their own decode pass.

use serde::Deserialize;
use serde_json::Value;

use super::EventError;

const FAMILY: &str = "whispers";

/// The sender of a whisper, assembled from `data.from_id` and the sender
/// `tags`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhisperSender {
    /// User id of the sender.
    pub id: Option<u64>,
    /// Login name of the sender.
    pub username: Option<String>,
    /// Display name of the sender.
    pub display_name: Option<String>,
    /// Chat color of the sender.
    pub color: Option<String>,
    /// Badges of the sender, passed through as received.
    pub badges: Vec<Value>,
    /// Emote sets usable by the sender, passed through as received.
    pub emotes: Vec<Value>,
}

/// The recipient of a whisper.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct WhisperRecipient {
    /// User id of the recipient.
    #[serde(default)]
    pub id: Option<u64>,
    /// Login name of the recipient.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name of the recipient.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Chat color of the recipient.
    #[serde(default)]
    pub color: Option<String>,
    /// Badges of the recipient, passed through as received.
    #[serde(default)]
    pub badges: Vec<Value>,
}

/// One whisper, sent or received.
#[derive(Debug, Clone, PartialEq)]
pub struct WhisperEvent {
    /// Message id within the thread.
    pub id: u64,
    /// Message body.
    pub body: String,
    /// Thread the message belongs to.
    pub thread_id: String,
    /// Sender details.
    pub sender: WhisperSender,
    /// Recipient details.
    pub recipient: WhisperRecipient,
    /// Server timestamp of the message.
    pub sent_ts: i64,
    /// Client nonce attached to the message, if any.
    pub nonce: Option<String>,
}

/// A whisper thread update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperThreadEvent {
    /// The thread being updated.
    pub thread_id: String,
}

/// Which event a whisper payload decodes to.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum WhisperKind {
    Sent(WhisperEvent),
    Received(WhisperEvent),
    Thread(WhisperThreadEvent),
}

#[derive(Deserialize)]
struct WhisperWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    data_object: Option<Value>,
}

#[derive(Deserialize, Default)]
struct WhisperObject {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    body: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    recipient: Option<Value>,
    #[serde(default)]
    sent_ts: i64,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    from_id: Option<u64>,
}

#[derive(Deserialize, Default)]
struct SenderTags {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    badges: Vec<Value>,
    #[serde(default)]
    emotes: Vec<Value>,
}

fn err(source: serde_json::Error) -> EventError {
    EventError::Payload {
        family: FAMILY,
        source,
    }
}

/// Some whisper sub-objects arrive JSON-encoded as strings; unwrap one
/// level before deserializing.
fn unwrap_nested(value: Value) -> Result<Value, EventError> {
    match value {
        Value::String(text) => serde_json::from_str(&text).map_err(err),
        structured => Ok(structured),
    }
}

fn nested<T: serde::de::DeserializeOwned + Default>(
    value: Option<Value>,
) -> Result<T, EventError> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(unwrap_nested(value)?).map_err(err),
    }
}

/// Decode a `whispers` payload.
///
/// Returns `Ok(None)` for unknown `type` discriminators.
pub(super) fn decode(payload: &Value) -> Result<Option<WhisperKind>, EventError> {
    let wire: WhisperWire = serde_json::from_value(payload.clone()).map_err(err)?;

    if wire.kind == "thread" {
        let object: WhisperObject = match wire.data_object {
            Some(value) => serde_json::from_value(unwrap_nested(value)?).map_err(err)?,
            None => {
                return Err(EventError::Payload {
                    family: FAMILY,
                    source: serde::de::Error::missing_field("data_object"),
                })
            }
        };
        return Ok(Some(WhisperKind::Thread(WhisperThreadEvent {
            thread_id: object.thread_id,
        })));
    }

    if wire.kind != "whisper_sent" && wire.kind != "whisper_received" {
        return Ok(None);
    }

    let object_value = wire.data_object.ok_or_else(|| EventError::Payload {
        family: FAMILY,
        source: serde::de::Error::missing_field("data_object"),
    })?;
    let object: WhisperObject =
        serde_json::from_value(unwrap_nested(object_value)?).map_err(err)?;
    let tags: SenderTags = nested(object.tags)?;
    let recipient: WhisperRecipient = nested(object.recipient)?;

    // The sender id lives in the sibling `data` blob; fall back to the
    // data_object's from_id when the blob is absent.
    let data: WhisperObject = nested(wire.data)?;
    let sender_id = data.from_id.or(object.from_id);

    let event = WhisperEvent {
        id: object.id,
        body: object.body,
        thread_id: object.thread_id,
        sender: WhisperSender {
            id: sender_id,
            username: tags.login,
            display_name: tags.display_name,
            color: tags.color,
            badges: tags.badges,
            emotes: tags.emotes,
        },
        recipient,
        sent_ts: object.sent_ts,
        nonce: object.nonce,
    };

    Ok(Some(match wire.kind.as_str() {
        "whisper_sent" => WhisperKind::Sent(event),
        _ => WhisperKind::Received(event),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn received_payload() -> Value {
        json!({
            "type": "whisper_received",
            "data": {"from_id": 101},
            "data_object": {
                "id": 41,
                "thread_id": "101_129",
                "body": "hello there",
                "sent_ts": 1479160009,
                "from_id": 101,
                "tags": {
                    "login": "sender",
                    "display_name": "Sender",
                    "color": "#8A2BE2",
                    "badges": [],
                    "emotes": []
                },
                "recipient": {
                    "id": 129,
                    "username": "receiver",
                    "display_name": "Receiver",
                    "color": "",
                    "badges": []
                },
                "nonce": "abc"
            }
        })
    }

    #[test]
    fn whisper_received() {
        let kind = decode(&received_payload()).unwrap().unwrap();
        let WhisperKind::Received(event) = kind else {
            panic!("expected received whisper, got {kind:?}");
        };
        assert_eq!(event.id, 41);
        assert_eq!(event.body, "hello there");
        assert_eq!(event.sender.id, Some(101));
        assert_eq!(event.sender.username.as_deref(), Some("sender"));
        assert_eq!(event.recipient.username.as_deref(), Some("receiver"));
        assert_eq!(event.sent_ts, 1479160009);
        assert_eq!(event.nonce.as_deref(), Some("abc"));
    }

    #[test]
    fn string_encoded_sub_objects() {
        let mut payload = received_payload();
        payload["type"] = json!("whisper_sent");
        let object = &mut payload["data_object"];
        object["tags"] = json!(object["tags"].to_string());
        object["recipient"] = json!(object["recipient"].to_string());

        let kind = decode(&payload).unwrap().unwrap();
        let WhisperKind::Sent(event) = kind else {
            panic!("expected sent whisper, got {kind:?}");
        };
        assert_eq!(event.sender.display_name.as_deref(), Some("Sender"));
        assert_eq!(event.recipient.id, Some(129));
    }

    #[test]
    fn thread_update() {
        let payload = json!({
            "type": "thread",
            "data_object": {"thread_id": "101_129"}
        });
        let kind = decode(&payload).unwrap().unwrap();
        assert_eq!(
            kind,
            WhisperKind::Thread(WhisperThreadEvent {
                thread_id: "101_129".to_string()
            })
        );
    }

    #[test]
    fn unknown_kind_dropped() {
        let payload = json!({"type": "whisper_typing", "data_object": {}});
        assert_eq!(decode(&payload).unwrap(), None);
    }
}
