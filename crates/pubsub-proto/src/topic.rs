//! Topic names and per-topic authorization.
//!
//! A topic is a namespaced subscription target of the form
//! `<family>.<scope-id>`, e.g. `video-playback.1234`. The family selects the
//! payload decoder; the scope id identifies the channel, user, or room the
//! topic is about.

use serde::{Deserialize, Serialize};

/// Split a topic name into `(family, scope)` at the first `.`.
///
/// A name without a `.` yields the whole name as the family and an empty
/// scope, which downstream decoders treat as unrecognized.
pub fn split_topic(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((family, scope)) => (family, scope),
        None => (name, ""),
    }
}

/// The closed set of topic families this library can decode.
///
/// Unlisted families are not an error anywhere in the pipeline; frames for
/// them are dropped so new server-side families never break the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicFamily {
    /// `channel-bits-events-v1` - cheer events.
    BitsEvents,
    /// `channel-bits-badge-unlocks` - bits badge tier unlocks.
    BitsBadgeUnlocks,
    /// `channel-points-channel-v1` - reward redemptions.
    ChannelPoints,
    /// `channel-subscribe-events-v1` - subs, resubs, gift subs.
    SubscribeEvents,
    /// `whispers` - direct messages to and from the authenticated user.
    Whispers,
    /// `video-playback` - stream up/down and viewer counts.
    VideoPlayback,
    /// `chat_moderator_actions` - moderation commands in a channel.
    ModeratorActions,
}

impl TopicFamily {
    /// Resolve a topic-name prefix to a known family.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "channel-bits-events-v1" => Some(Self::BitsEvents),
            "channel-bits-badge-unlocks" => Some(Self::BitsBadgeUnlocks),
            "channel-points-channel-v1" => Some(Self::ChannelPoints),
            "channel-subscribe-events-v1" => Some(Self::SubscribeEvents),
            "whispers" => Some(Self::Whispers),
            "video-playback" => Some(Self::VideoPlayback),
            "chat_moderator_actions" => Some(Self::ModeratorActions),
            _ => None,
        }
    }

    /// The wire prefix for this family.
    pub fn as_prefix(&self) -> &'static str {
        match self {
            Self::BitsEvents => "channel-bits-events-v1",
            Self::BitsBadgeUnlocks => "channel-bits-badge-unlocks",
            Self::ChannelPoints => "channel-points-channel-v1",
            Self::SubscribeEvents => "channel-subscribe-events-v1",
            Self::Whispers => "whispers",
            Self::VideoPlayback => "video-playback",
            Self::ModeratorActions => "chat_moderator_actions",
        }
    }
}

/// A subscription target plus its optional authorization token.
///
/// Topics are immutable once created; two topics are the same subscription
/// iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    name: String,
    auth_token: Option<String>,
}

impl Topic {
    /// A topic with no authorization token.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_token: None,
        }
    }

    /// A topic carrying an authorization token.
    pub fn with_token(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_token: Some(token.into()),
        }
    }

    /// The full topic name, e.g. `whispers.44322889`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The authorization token, if one was supplied.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The family prefix of the name (before the first `.`).
    pub fn family_prefix(&self) -> &str {
        split_topic(&self.name).0
    }

    /// The known family, if the prefix is recognized.
    pub fn family(&self) -> Option<TopicFamily> {
        TopicFamily::from_prefix(self.family_prefix())
    }

    /// The scope id of the name (after the first `.`).
    pub fn scope(&self) -> &str {
        split_topic(&self.name).1
    }
}
