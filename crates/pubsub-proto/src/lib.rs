//! # pubsub-proto
//!
//! A Rust library for the Twitch PubSub wire protocol: frame
//! parsing/serialization, topic naming, and decoding of published payloads
//! into normalized domain events.
//!
//! ## Features
//!
//! - Typed outbound frames (`PING`, `LISTEN`, `UNLISTEN`) with JSON encoding
//! - Typed inbound frames (`PONG`, `RECONNECT`, `RESPONSE`, `MESSAGE`) with
//!   the protocol's string-re-encoded payloads decoded transparently
//! - Topic family classification with a forward-compatible drop policy for
//!   unknown families
//! - Domain-event decoding for bits, badge unlocks, channel points,
//!   subscriptions, whispers, video playback, and moderator actions
//! - Correlation nonce generation
//!
//! This crate is pure data: no sockets, no async. Session management lives
//! in the client crate built on top of it.

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use pubsub_proto::{generate_nonce, InboundFrame, OutboundFrame, Topic};
//!
//! // Build and encode a LISTEN request.
//! let topics = [Topic::new("video-playback.1234")];
//! let listen = OutboundFrame::listen(generate_nonce(), &topics);
//! let json = listen.encode().expect("frame serializes");
//! assert!(json.contains("\"LISTEN\""));
//!
//! // Decode the server's acknowledgment.
//! let frame = InboundFrame::parse(r#"{"type":"RESPONSE","nonce":"n1","error":""}"#)
//!     .expect("valid frame");
//! match frame {
//!     InboundFrame::Response(response) => assert!(response.error.is_none()),
//!     _ => unreachable!(),
//! }
//! ```

pub mod error;
pub mod event;
pub mod frame;
pub mod nonce;
pub mod topic;

pub use self::error::{FrameError, ResponseError};
pub use self::event::{decode_event, DomainEvent, EventError};
pub use self::frame::{InboundFrame, OutboundFrame, Response, TopicMessage};
pub use self::nonce::generate_nonce;
pub use self::topic::{split_topic, Topic, TopicFamily};
