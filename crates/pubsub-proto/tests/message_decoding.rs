//! Integration tests for the full inbound path: raw frame text through
//! `InboundFrame::parse` into `decode_event`.

use pubsub_proto::event::{ModeratorAction, ViewCountEvent};
use pubsub_proto::{decode_event, DomainEvent, InboundFrame};

fn decode_message(raw: &str) -> Option<DomainEvent> {
    let frame = InboundFrame::parse(raw).expect("frame should parse");
    let InboundFrame::Message(message) = frame else {
        panic!("expected MESSAGE frame, got {frame:?}");
    };
    decode_event(&message.topic, &message.payload).expect("payload should decode")
}

#[test]
fn viewcount_from_string_encoded_payload() {
    // The payload arrives as a JSON-encoded string, as the live service
    // sends it.
    let raw = r#"{
        "type": "MESSAGE",
        "data": {
            "topic": "video-playback.1234",
            "message": "{\"type\":\"viewcount\",\"server_time\":100,\"viewers\":42}"
        }
    }"#;

    let event = decode_message(raw).expect("known family should produce an event");
    assert_eq!(
        event,
        DomainEvent::ViewCount(ViewCountEvent {
            time: 100.0,
            channel_name: "1234".to_string(),
            viewers: 42,
        })
    );
}

#[test]
fn ban_action_from_moderator_topic() {
    let raw = r#"{
        "type": "MESSAGE",
        "data": {
            "topic": "chat_moderator_actions.1.1",
            "message": {
                "data": {
                    "moderation_action": "ban",
                    "args": ["userX", "spam"],
                    "target_user_id": "9",
                    "created_by": "mod1",
                    "created_by_user_id": "5"
                }
            }
        }
    }"#;

    let event = decode_message(raw).expect("ban should produce an event");
    let DomainEvent::ModeratorAction(ModeratorAction::Ban {
        target,
        target_user_id,
        reason,
        moderator,
    }) = event
    else {
        panic!("expected ban action, got {event:?}");
    };
    assert_eq!(target, "userX");
    assert_eq!(target_user_id, "9");
    assert_eq!(reason.as_deref(), Some("spam"));
    assert_eq!(moderator.created_by, "mod1");
    assert_eq!(moderator.created_by_user_id, "5");
}

#[test]
fn unknown_family_produces_no_event() {
    let raw = r#"{
        "type": "MESSAGE",
        "data": {
            "topic": "leaderboard-events-v1.999",
            "message": {"anything": [1, 2, 3]}
        }
    }"#;

    assert_eq!(decode_message(raw), None);
}

#[test]
fn scope_id_with_dots_reaches_the_decoder_intact() {
    // chat_moderator_actions scope ids contain a second dot; only the first
    // dot splits family from scope.
    let raw = r#"{
        "type": "MESSAGE",
        "data": {
            "topic": "chat_moderator_actions.44322889.12345",
            "message": {
                "data": {
                    "moderation_action": "clear",
                    "args": null,
                    "created_by": "mod1",
                    "created_by_user_id": "5"
                }
            }
        }
    }"#;

    let event = decode_message(raw).expect("clear should produce an event");
    assert!(matches!(
        event,
        DomainEvent::ModeratorAction(ModeratorAction::Clear { .. })
    ));
}
