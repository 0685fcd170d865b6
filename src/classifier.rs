//! Routing of decoded MESSAGE frames.
//!
//! Thin dispatch over the pure decoders in [`pubsub_proto::event`]: the
//! session hands every MESSAGE frame here and emits whatever comes back.
//! Unknown topic families are dropped without a signal; malformed payloads
//! of known families become anomaly reports.

use pubsub_proto::{decode_event, DomainEvent, EventError, TopicMessage};
use tracing::debug;

/// What a MESSAGE frame turned into.
pub(crate) enum Classification {
    /// One normalized event to emit.
    Event(DomainEvent),
    /// Unrecognized family or discriminator; dropped by policy.
    Dropped,
    /// Known family, unusable payload; reported and discarded.
    Malformed(EventError),
}

pub(crate) fn classify(message: &TopicMessage) -> Classification {
    match decode_event(&message.topic, &message.payload) {
        Ok(Some(event)) => {
            debug!(topic = %message.topic, kind = event.kind(), "domain event");
            Classification::Event(event)
        }
        Ok(None) => {
            debug!(topic = %message.topic, "unrecognized topic or discriminator, dropping");
            Classification::Dropped
        }
        Err(error) => Classification::Malformed(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(topic: &str, payload: serde_json::Value) -> TopicMessage {
        TopicMessage {
            topic: topic.to_string(),
            payload,
        }
    }

    #[test]
    fn known_family_classifies_to_event() {
        let msg = message(
            "video-playback.1234",
            json!({"type": "viewcount", "server_time": 100, "viewers": 42}),
        );
        assert!(matches!(
            classify(&msg),
            Classification::Event(DomainEvent::ViewCount(_))
        ));
    }

    #[test]
    fn unknown_family_drops_without_error() {
        let msg = message("new-family.1", json!({"whatever": 1}));
        assert!(matches!(classify(&msg), Classification::Dropped));
    }

    #[test]
    fn malformed_known_family_reports() {
        let msg = message("channel-bits-events-v1.1", json!({"data": 17}));
        assert!(matches!(classify(&msg), Classification::Malformed(_)));
    }
}
