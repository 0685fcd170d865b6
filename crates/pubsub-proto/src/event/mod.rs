//! Domain events decoded from `MESSAGE` frame payloads.
//!
//! [`decode_event`] is the pure core of the classifier: given a topic name
//! and its (already structurally decoded) payload, it produces at most one
//! normalized [`DomainEvent`]. Unrecognized topic families and unrecognized
//! inner discriminators yield `Ok(None)` so new server-side event kinds can
//! never crash a client; malformed payloads of a *known* family are errors
//! the caller reports and discards.

mod moderation;
mod whisper;

pub use moderation::{Moderator, ModeratorAction};
pub use whisper::{
    WhisperEvent, WhisperRecipient, WhisperSender, WhisperThreadEvent,
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::topic::{split_topic, TopicFamily};

/// A payload of a known family that did not match its expected shape.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventError {
    /// Deserialization of the family's payload shape failed.
    #[error("malformed {family} payload: {source}")]
    Payload {
        /// The topic family whose decoder rejected the payload.
        family: &'static str,
        /// The underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// A cheer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BitsEvent {
    /// Bits used in this cheer.
    pub bits_used: u64,
    /// Id of the channel cheered in.
    pub channel_id: String,
    /// Name of the channel cheered in.
    pub channel_name: String,
    /// Chat message sent with the cheer.
    #[serde(default)]
    pub chat_message: Option<String>,
    /// Event context, e.g. `cheer`.
    pub context: String,
    /// Message id.
    #[serde(default)]
    pub message_id: String,
    /// Message type tag.
    #[serde(default)]
    pub message_type: String,
    /// When the bits were used (RFC 3339).
    pub time: String,
    /// All-time bits used on this channel by this user.
    pub total_bits_used: u64,
    /// Id of the cheering user; absent for anonymous cheers.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Login of the cheering user; absent for anonymous cheers.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Payload version.
    #[serde(default)]
    pub version: String,
}

/// A bits badge tier unlock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BitsBadgeUnlockEvent {
    /// Id of the user who unlocked the badge.
    pub user_id: String,
    /// Login of the user who unlocked the badge.
    pub user_name: String,
    /// Id of the channel the badge was earned in.
    pub channel_id: String,
    /// Name of the channel the badge was earned in.
    pub channel_name: String,
    /// The unlocked tier, in bits.
    pub badge_tier: u64,
    /// Message the user shared about the unlock, if any.
    #[serde(default)]
    pub chat_message: Option<String>,
    /// When the badge was unlocked (RFC 3339).
    pub time: String,
}

/// The redeeming user of a channel-points reward.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedemptionUser {
    /// User id.
    pub id: String,
    /// Login name.
    pub login: String,
    /// Display name.
    pub display_name: String,
}

/// The redeemed reward.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reward {
    /// Reward id.
    pub id: String,
    /// Reward title.
    pub title: String,
    /// Cost in channel points.
    pub cost: u64,
    /// Prompt shown to the redeeming user, if any.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// One reward redemption.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Redemption {
    /// Redemption id.
    pub id: String,
    /// Who redeemed.
    pub user: RedemptionUser,
    /// What was redeemed.
    pub reward: Reward,
    /// Text the user entered, for rewards that ask for input.
    #[serde(default)]
    pub user_input: Option<String>,
    /// Fulfillment status.
    #[serde(default)]
    pub status: Option<String>,
}

/// A channel-points reward redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPointsEvent {
    /// Server timestamp of the redemption.
    pub timestamp: String,
    /// The redemption itself.
    pub redemption: Redemption,
}

/// The resub message attached to a subscription event.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SubMessage {
    /// Message text, if the subscriber wrote one.
    #[serde(default)]
    pub message: Option<String>,
    /// Emotes in the message, passed through as received.
    #[serde(default)]
    pub emotes: Vec<Value>,
}

/// A sub, resub, or gift sub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionEvent {
    /// Login of the subscriber; absent for anonymous gifts.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Display name of the subscriber.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Name of the channel subscribed to.
    pub channel_name: String,
    /// Id of the subscriber; absent for anonymous gifts.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Id of the channel subscribed to.
    pub channel_id: String,
    /// Time of the event (RFC 3339).
    pub time: String,
    /// Plan identifier (`Prime`, `1000`, `2000`, `3000`).
    pub sub_plan: String,
    /// Human-readable plan name.
    #[serde(default)]
    pub sub_plan_name: String,
    /// Cumulative months subscribed.
    #[serde(default)]
    pub months: Option<u64>,
    /// Event context (`sub`, `resub`, `subgift`, ...).
    pub context: String,
    /// Message shared with the event, if any.
    #[serde(default)]
    pub sub_message: Option<SubMessage>,
}

/// Stream went live.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpEvent {
    /// Server time of the transition.
    pub time: f64,
    /// Channel that went live (from the topic scope id).
    pub channel_name: String,
    /// Configured broadcast delay in seconds, when present.
    pub play_delay: Option<u64>,
}

/// Stream went offline.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDownEvent {
    /// Server time of the transition.
    pub time: f64,
    /// Channel that went offline (from the topic scope id).
    pub channel_name: String,
}

/// Periodic viewer-count update for a live stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCountEvent {
    /// Server time of the sample.
    pub time: f64,
    /// Channel being watched (from the topic scope id).
    pub channel_name: String,
    /// Current concurrent viewers.
    pub viewers: u64,
}

/// Every event this library can produce, tagged by family.
///
/// Events are produced and handed to the consumer; nothing here is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A cheer.
    Bits(BitsEvent),
    /// A bits badge tier unlock.
    BitsBadgeUnlock(BitsBadgeUnlockEvent),
    /// A channel-points redemption.
    ChannelPoints(ChannelPointsEvent),
    /// A sub, resub, or gift sub.
    Subscription(SubscriptionEvent),
    /// A whisper sent by the authenticated user.
    WhisperSent(WhisperEvent),
    /// A whisper received by the authenticated user.
    WhisperReceived(WhisperEvent),
    /// A whisper thread update.
    WhisperThread(WhisperThreadEvent),
    /// Stream went live.
    StreamUp(StreamUpEvent),
    /// Stream went offline.
    StreamDown(StreamDownEvent),
    /// Viewer-count sample.
    ViewCount(ViewCountEvent),
    /// A moderation action in a channel.
    ModeratorAction(ModeratorAction),
}

impl DomainEvent {
    /// A short tag naming the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bits(_) => "bits",
            Self::BitsBadgeUnlock(_) => "bits_badge_unlock",
            Self::ChannelPoints(_) => "channel_points",
            Self::Subscription(_) => "subscribe",
            Self::WhisperSent(_) => "whisper_sent",
            Self::WhisperReceived(_) => "whisper_received",
            Self::WhisperThread(_) => "thread",
            Self::StreamUp(_) => "stream-up",
            Self::StreamDown(_) => "stream-down",
            Self::ViewCount(_) => "viewcount",
            Self::ModeratorAction(action) => action.action(),
        }
    }
}

/// Decode a `MESSAGE` payload into at most one domain event.
///
/// `topic` selects the family decoder by its prefix; for `video-playback`
/// the topic's scope id also supplies the channel identity. Unrecognized
/// families and discriminators return `Ok(None)`.
pub fn decode_event(topic: &str, payload: &Value) -> Result<Option<DomainEvent>, EventError> {
    let (prefix, scope) = split_topic(topic);
    let Some(family) = TopicFamily::from_prefix(prefix) else {
        return Ok(None);
    };

    match family {
        TopicFamily::BitsEvents => {
            let event: Wrapped<BitsEvent> = from_payload(family, payload)?;
            Ok(Some(DomainEvent::Bits(event.data)))
        }
        TopicFamily::BitsBadgeUnlocks => {
            let event: BitsBadgeUnlockEvent = from_payload(family, payload)?;
            Ok(Some(DomainEvent::BitsBadgeUnlock(event)))
        }
        TopicFamily::ChannelPoints => decode_channel_points(payload),
        TopicFamily::SubscribeEvents => {
            let event: SubscriptionEvent = from_payload(family, payload)?;
            Ok(Some(DomainEvent::Subscription(event)))
        }
        TopicFamily::Whispers => Ok(whisper::decode(payload)?.map(|kind| match kind {
            whisper::WhisperKind::Sent(event) => DomainEvent::WhisperSent(event),
            whisper::WhisperKind::Received(event) => DomainEvent::WhisperReceived(event),
            whisper::WhisperKind::Thread(event) => DomainEvent::WhisperThread(event),
        })),
        TopicFamily::VideoPlayback => decode_playback(scope, payload),
        TopicFamily::ModeratorActions => {
            Ok(moderation::decode(payload)?.map(DomainEvent::ModeratorAction))
        }
    }
}

/// Payloads whose fields sit one level down inside a `data` wrapper.
#[derive(Deserialize)]
struct Wrapped<T> {
    data: T,
}

fn from_payload<T: serde::de::DeserializeOwned>(
    family: TopicFamily,
    payload: &Value,
) -> Result<T, EventError> {
    serde_json::from_value(payload.clone()).map_err(|source| EventError::Payload {
        family: family.as_prefix(),
        source,
    })
}

#[derive(Deserialize)]
struct PointsWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<PointsData>,
}

#[derive(Deserialize)]
struct PointsData {
    timestamp: String,
    redemption: Redemption,
}

fn decode_channel_points(payload: &Value) -> Result<Option<DomainEvent>, EventError> {
    let wire: PointsWire = from_payload(TopicFamily::ChannelPoints, payload)?;
    if wire.kind != "reward-redeemed" {
        return Ok(None);
    }
    let data = wire.data.ok_or_else(|| EventError::Payload {
        family: TopicFamily::ChannelPoints.as_prefix(),
        source: serde::de::Error::missing_field("data"),
    })?;
    Ok(Some(DomainEvent::ChannelPoints(ChannelPointsEvent {
        timestamp: data.timestamp,
        redemption: data.redemption,
    })))
}

#[derive(Deserialize)]
struct PlaybackWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    server_time: f64,
    #[serde(default)]
    play_delay: Option<u64>,
    #[serde(default)]
    viewers: Option<u64>,
}

/// `video-playback` carries the channel identity in the topic scope id, not
/// the payload.
fn decode_playback(scope: &str, payload: &Value) -> Result<Option<DomainEvent>, EventError> {
    let wire: PlaybackWire = from_payload(TopicFamily::VideoPlayback, payload)?;
    let channel_name = scope.to_string();
    Ok(match wire.kind.as_str() {
        "stream-up" => Some(DomainEvent::StreamUp(StreamUpEvent {
            time: wire.server_time,
            channel_name,
            play_delay: wire.play_delay,
        })),
        "stream-down" => Some(DomainEvent::StreamDown(StreamDownEvent {
            time: wire.server_time,
            channel_name,
        })),
        "viewcount" => Some(DomainEvent::ViewCount(ViewCountEvent {
            time: wire.server_time,
            channel_name,
            viewers: wire.viewers.unwrap_or(0),
        })),
        _ => None,
    })
}
