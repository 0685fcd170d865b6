//! The consumer-facing event stream.

use pubsub_proto::{DomainEvent, InboundFrame};
use tokio::sync::mpsc;

use crate::error::ErrorEvent;

/// Everything the session reports to the consumer.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The initial topic replay was acknowledged on a fresh connection.
    Connected,
    /// The connection is gone (socket closed, or the bootstrap replay was
    /// rejected).
    Disconnected,
    /// A reconnect cycle has been scheduled.
    Reconnecting,
    /// A non-fatal anomaly.
    Error(ErrorEvent),
    /// Every decoded inbound frame, for observability.
    Raw(InboundFrame),
    /// A normalized domain event.
    Event(DomainEvent),
}

/// Receiving half of the event stream handed out by
/// [`crate::PubSubClient::connect`].
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

pub(crate) type EventSender = mpsc::UnboundedSender<ClientEvent>;
