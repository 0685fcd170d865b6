//! Client configuration.

use std::time::Duration;

use pubsub_proto::Topic;
use thiserror::Error;

/// The vendor endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "wss://pubsub-edge.twitch.tv";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Construction requires at least one initial topic.
    #[error("initial topic list must not be empty")]
    NoInitialTopics,
}

/// Construction-time configuration for a [`crate::PubSubClient`].
///
/// Only `initial_topics` is required; everything else defaults to the
/// values the live service expects.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint to connect to.
    pub endpoint: String,
    /// Reconnect automatically when the socket closes.
    pub reconnect: bool,
    /// Topics subscribed on every successful connect (the bootstrap set).
    pub initial_topics: Vec<Topic>,
    /// Log every decoded inbound frame at debug level.
    pub log_frames: bool,
    /// Interval between keepalive PINGs.
    pub ping_interval: Duration,
    /// How long to wait for a PONG before treating the connection as dead.
    pub pong_timeout: Duration,
    /// How long a LISTEN/UNLISTEN may stay unanswered before it times out.
    pub operation_timeout: Duration,
    /// Delay before reconnecting after a server-requested reconnect or a
    /// keepalive timeout. Socket-close reconnects use a growing delay
    /// instead.
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the bootstrap set.
    pub fn new(initial_topics: Vec<Topic>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect: true,
            initial_topics,
            log_frames: false,
            ping_interval: Duration::from_secs(300),
            pong_timeout: Duration::from_secs(15),
            operation_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_topics.is_empty() {
            return Err(ConfigError::NoInitialTopics);
        }
        Ok(())
    }
}
