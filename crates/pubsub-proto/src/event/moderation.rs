//! Decoding for `chat_moderator_actions` payloads.
//!
//! The payload carries a free-form `moderation_action` discriminator plus a
//! positional `args` array whose meaning depends on the action. Decoding
//! maps that onto a closed enum; actions outside the known set are dropped,
//! not errors.

use serde::Deserialize;
use serde_json::Value;

use super::EventError;

/// The moderator who performed an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moderator {
    /// Login name of the moderator.
    pub created_by: String,
    /// User id of the moderator.
    pub created_by_user_id: String,
}

/// A normalized moderation action.
///
/// `args` conventions per action: ban is `[target, reason?]`, timeout is
/// `[target, seconds, reason?]`, slow is `[seconds]`, followers-only is
/// `[minutes]`, term edits are `[term]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeratorAction {
    /// Permanent ban of a user.
    Ban {
        /// Login of the banned user.
        target: String,
        /// User id of the banned user.
        target_user_id: String,
        /// Reason supplied with the ban, if any.
        reason: Option<String>,
        /// Who issued the ban.
        moderator: Moderator,
    },
    /// Ban lifted.
    Unban {
        /// Login of the unbanned user.
        target: String,
        /// User id of the unbanned user.
        target_user_id: String,
        /// Who lifted the ban.
        moderator: Moderator,
    },
    /// Temporary timeout of a user.
    Timeout {
        /// Login of the timed-out user.
        target: String,
        /// User id of the timed-out user.
        target_user_id: String,
        /// Timeout length in seconds, when parseable.
        duration_secs: Option<u64>,
        /// Reason supplied with the timeout, if any.
        reason: Option<String>,
        /// Who issued the timeout.
        moderator: Moderator,
    },
    /// Timeout lifted early.
    Untimeout {
        /// Login of the user.
        target: String,
        /// User id of the user.
        target_user_id: String,
        /// Who lifted the timeout.
        moderator: Moderator,
    },
    /// Chat history cleared.
    Clear {
        /// Who cleared the chat.
        moderator: Moderator,
    },
    /// Slow mode enabled.
    Slow {
        /// Seconds between messages, when parseable.
        interval_secs: Option<u64>,
        /// Who enabled it.
        moderator: Moderator,
    },
    /// Slow mode disabled.
    SlowOff {
        /// Who disabled it.
        moderator: Moderator,
    },
    /// Followers-only mode enabled.
    FollowersOnly {
        /// Minimum follow age in minutes, when parseable.
        duration_mins: Option<u64>,
        /// Who enabled it.
        moderator: Moderator,
    },
    /// Followers-only mode disabled.
    FollowersOnlyOff {
        /// Who disabled it.
        moderator: Moderator,
    },
    /// Subscribers-only mode enabled.
    SubscribersOnly {
        /// Who enabled it.
        moderator: Moderator,
    },
    /// Subscribers-only mode disabled.
    SubscribersOnlyOff {
        /// Who disabled it.
        moderator: Moderator,
    },
    /// Unique-chat (r9k) mode enabled.
    UniqueChat {
        /// Who enabled it.
        moderator: Moderator,
    },
    /// Unique-chat (r9k) mode disabled.
    UniqueChatOff {
        /// Who disabled it.
        moderator: Moderator,
    },
    /// A held message approved through AutoMod.
    AutomodApproved {
        /// Login of the message author.
        target: String,
        /// User id of the message author.
        target_user_id: String,
        /// Who approved it.
        moderator: Moderator,
    },
    /// A held message rejected through AutoMod.
    AutomodDenied {
        /// Login of the message author.
        target: String,
        /// User id of the message author.
        target_user_id: String,
        /// Who rejected it.
        moderator: Moderator,
    },
    /// Term added to the blocked list.
    BlockedTermAdded {
        /// The blocked term.
        term: String,
        /// Who added it.
        moderator: Moderator,
    },
    /// Term removed from the blocked list.
    BlockedTermRemoved {
        /// The removed term.
        term: String,
        /// Who removed it.
        moderator: Moderator,
    },
    /// Term added to the permitted list.
    PermittedTermAdded {
        /// The permitted term.
        term: String,
        /// Who added it.
        moderator: Moderator,
    },
    /// Term removed from the permitted list.
    PermittedTermRemoved {
        /// The removed term.
        term: String,
        /// Who removed it.
        moderator: Moderator,
    },
    /// Hosting stopped.
    Unhost {
        /// Who stopped hosting.
        moderator: Moderator,
    },
}

impl ModeratorAction {
    /// The wire `moderation_action` value this variant was decoded from.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Ban { .. } => "ban",
            Self::Unban { .. } => "unban",
            Self::Timeout { .. } => "timeout",
            Self::Untimeout { .. } => "untimeout",
            Self::Clear { .. } => "clear",
            Self::Slow { .. } => "slow",
            Self::SlowOff { .. } => "slowoff",
            Self::FollowersOnly { .. } => "followersonly",
            Self::FollowersOnlyOff { .. } => "followersonlyoff",
            Self::SubscribersOnly { .. } => "subscribers",
            Self::SubscribersOnlyOff { .. } => "subscribersoff",
            Self::UniqueChat { .. } => "r9kbeta",
            Self::UniqueChatOff { .. } => "r9kbetaoff",
            Self::AutomodApproved { .. } => "approve_automod_message",
            Self::AutomodDenied { .. } => "deny_automod_message",
            Self::BlockedTermAdded { .. } => "add_blocked_term",
            Self::BlockedTermRemoved { .. } => "delete_blocked_term",
            Self::PermittedTermAdded { .. } => "add_permitted_term",
            Self::PermittedTermRemoved { .. } => "delete_permitted_term",
            Self::Unhost { .. } => "unhost",
        }
    }
}

#[derive(Deserialize)]
struct ModerationWire {
    data: ModerationData,
}

#[derive(Deserialize)]
struct ModerationData {
    moderation_action: String,
    #[serde(default)]
    args: Option<Vec<Value>>,
    #[serde(default)]
    target_user_id: String,
    #[serde(default)]
    created_by: String,
    #[serde(default)]
    created_by_user_id: String,
}

impl ModerationData {
    fn moderator(&self) -> Moderator {
        Moderator {
            created_by: self.created_by.clone(),
            created_by_user_id: self.created_by_user_id.clone(),
        }
    }

    /// Positional argument as a string; numbers are stringified since the
    /// server is inconsistent about quoting durations.
    fn arg(&self, index: usize) -> Option<String> {
        match self.args.as_ref()?.get(index)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn arg_u64(&self, index: usize) -> Option<u64> {
        self.arg(index)?.parse().ok()
    }
}

/// Decode a `chat_moderator_actions` payload.
///
/// Returns `Ok(None)` for actions outside the known set.
pub(super) fn decode(payload: &Value) -> Result<Option<ModeratorAction>, EventError> {
    let wire: ModerationWire =
        serde_json::from_value(payload.clone()).map_err(|source| EventError::Payload {
            family: "chat_moderator_actions",
            source,
        })?;
    let data = wire.data;
    let moderator = data.moderator();
    let target = || data.arg(0).unwrap_or_default();

    let action = match data.moderation_action.as_str() {
        "ban" => ModeratorAction::Ban {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            reason: data.arg(1),
            moderator,
        },
        "unban" => ModeratorAction::Unban {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            moderator,
        },
        "timeout" => ModeratorAction::Timeout {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            duration_secs: data.arg_u64(1),
            reason: data.arg(2),
            moderator,
        },
        "untimeout" => ModeratorAction::Untimeout {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            moderator,
        },
        "clear" => ModeratorAction::Clear { moderator },
        "slow" => ModeratorAction::Slow {
            interval_secs: data.arg_u64(0),
            moderator,
        },
        "slowoff" => ModeratorAction::SlowOff { moderator },
        "followersonly" => ModeratorAction::FollowersOnly {
            duration_mins: data.arg_u64(0),
            moderator,
        },
        "followersonlyoff" => ModeratorAction::FollowersOnlyOff { moderator },
        "subscribers" => ModeratorAction::SubscribersOnly { moderator },
        "subscribersoff" => ModeratorAction::SubscribersOnlyOff { moderator },
        "r9kbeta" => ModeratorAction::UniqueChat { moderator },
        "r9kbetaoff" => ModeratorAction::UniqueChatOff { moderator },
        "approve_automod_message" => ModeratorAction::AutomodApproved {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            moderator,
        },
        "deny_automod_message" => ModeratorAction::AutomodDenied {
            target: target(),
            target_user_id: data.target_user_id.clone(),
            moderator,
        },
        "add_blocked_term" => ModeratorAction::BlockedTermAdded {
            term: target(),
            moderator,
        },
        "delete_blocked_term" => ModeratorAction::BlockedTermRemoved {
            term: target(),
            moderator,
        },
        "add_permitted_term" => ModeratorAction::PermittedTermAdded {
            term: target(),
            moderator,
        },
        "delete_permitted_term" => ModeratorAction::PermittedTermRemoved {
            term: target(),
            moderator,
        },
        "unhost" => ModeratorAction::Unhost { moderator },
        _ => return Ok(None),
    };
    Ok(Some(action))
}
