//! Long-lived client for the Twitch PubSub event feed.
//!
//! One persistent WebSocket carries everything: the client subscribes to
//! named topics (optionally with per-topic auth tokens), keeps the socket
//! alive with PING/PONG, reconnects on failure, and turns inbound frames
//! into normalized domain events on an ordinary channel.
//!
//! ```no_run
//! use twitch_pubsub::{ClientConfig, ClientEvent, PubSubClient, Topic};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new(vec![Topic::new("video-playback.1234")]);
//! let (client, mut events) = PubSubClient::connect(config)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::Connected => println!("subscribed"),
//!         ClientEvent::Event(event) => println!("{}", event.kind()),
//!         _ => {}
//!     }
//! }
//! # client.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! The session runs as one spawned task owning the socket, the pending
//! request table, and all timers; handles and the event stream are plain
//! mpsc channels. Nothing in this crate blocks or locks.

mod classifier;
mod client;
mod config;
mod correlation;
mod error;
mod events;
mod registry;
mod session;

pub use pubsub_proto as proto;
pub use pubsub_proto::{
    DomainEvent, FrameError, InboundFrame, OutboundFrame, ResponseError, Topic, TopicFamily,
};

pub use crate::client::PubSubClient;
pub use crate::config::{ClientConfig, ConfigError, DEFAULT_ENDPOINT};
pub use crate::error::{ErrorEvent, ErrorOrigin, OperationError};
pub use crate::events::{ClientEvent, EventReceiver};
