//! The open-connection event loop.
//!
//! Runs from the moment a socket is open until something ends the
//! connection, multiplexing one `select!` over inbound frames, client
//! commands, the keepalive timers, and operation deadlines.
//! Each pass produces one [`SelectOutcome`], handled in a single match so
//! every mutation of session state stays on this one logical thread.

use futures_util::{SinkExt, StreamExt};
use pubsub_proto::{FrameError, InboundFrame, OutboundFrame};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::{debug, info, warn};

use super::keepalive::KeepaliveState;
use super::{apply_resolution, emit, CloseReason, Command, Session, WsStream};
use crate::classifier::{classify, Classification};
use crate::correlation::{OperationKind, OperationReply};
use crate::error::{ErrorEvent, ErrorOrigin};
use crate::events::{ClientEvent, EventSender};

enum SelectOutcome {
    /// A decoded inbound frame.
    Frame(InboundFrame),
    /// An inbound frame that failed to decode; report and discard.
    FrameError(FrameError),
    /// The transport reported a read error.
    TransportError(tungstenite::Error),
    /// The peer closed, or the stream ended.
    SocketClosed,
    /// A request from a client handle.
    Command(Command),
    /// Every client handle is gone.
    CommandsClosed,
    /// Keepalive interval elapsed; send a PING.
    SendPing,
    /// The armed pong deadline fired.
    PongTimeout,
    /// An operation deadline fired.
    OperationExpired(String),
    /// Transport-level noise (ws ping/pong); nothing to do.
    Idle,
}

fn classify_transport(
    incoming: Option<Result<WsMessage, tungstenite::Error>>,
) -> SelectOutcome {
    match incoming {
        Some(Ok(WsMessage::Text(text))) => match InboundFrame::parse(&text) {
            Ok(frame) => SelectOutcome::Frame(frame),
            Err(error) => SelectOutcome::FrameError(error),
        },
        Some(Ok(WsMessage::Binary(bytes))) => {
            match InboundFrame::parse(&String::from_utf8_lossy(&bytes)) {
                Ok(frame) => SelectOutcome::Frame(frame),
                Err(error) => SelectOutcome::FrameError(error),
            }
        }
        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {
            SelectOutcome::Idle
        }
        Some(Ok(WsMessage::Close(_))) | None => SelectOutcome::SocketClosed,
        Some(Err(error)) => SelectOutcome::TransportError(error),
    }
}

async fn send_frame(
    socket: &mut WsStream,
    frame: &OutboundFrame,
    events: &EventSender,
) -> Result<(), tungstenite::Error> {
    let text = match frame.encode() {
        Ok(text) => text,
        Err(error) => {
            // Encoding plain data cannot realistically fail; report and
            // keep the connection.
            warn!(%error, "outbound frame failed to encode");
            emit(
                events,
                ClientEvent::Error(ErrorEvent::new(ErrorOrigin::Frame, error.to_string())),
            );
            return Ok(());
        }
    };
    socket.send(WsMessage::Text(text)).await
}

/// Run one open connection to completion.
pub(super) async fn run_open(session: &mut Session, mut socket: WsStream) -> CloseReason {
    let Session {
        config,
        table,
        registry,
        deferred,
        bootstrap_nonce,
        events,
        commands,
        ..
    } = session;

    let mut keepalive = KeepaliveState::new(config.pong_timeout);
    let mut ping_timer = tokio::time::interval(config.ping_interval);
    // The first tick completes immediately; the keepalive cadence starts
    // one full interval after open.
    ping_timer.tick().await;

    // Replay the bootstrap set: one LISTEN per topic, in declaration order.
    // The first nonce of the replay is the bootstrap token. A replay from a
    // previous connection that never resolved must not report for this one.
    *bootstrap_nonce = None;
    for topic in registry.initial().to_vec() {
        let (nonce, frame) = table.issue(
            OperationKind::Listen,
            vec![topic],
            OperationReply::Replay,
        );
        if bootstrap_nonce.is_none() {
            *bootstrap_nonce = Some(nonce);
        }
        if let Err(error) = send_frame(&mut socket, &frame, events).await {
            return socket_write_failed(events, error);
        }
    }

    // Drain requests parked while no connection was open.
    while let Some(op) = deferred.pop_front() {
        let (_, frame) = table.issue(op.kind, op.topics, op.reply);
        if let Err(error) = send_frame(&mut socket, &frame, events).await {
            return socket_write_failed(events, error);
        }
    }

    loop {
        let outcome = tokio::select! {
            incoming = socket.next() => classify_transport(incoming),

            command = commands.recv() => match command {
                Some(command) => SelectOutcome::Command(command),
                None => SelectOutcome::CommandsClosed,
            },

            _ = ping_timer.tick() => SelectOutcome::SendPing,

            _ = keepalive.deadline_elapsed() => SelectOutcome::PongTimeout,

            nonce = table.next_expired() => SelectOutcome::OperationExpired(nonce),
        };

        match outcome {
            SelectOutcome::Idle => continue,

            SelectOutcome::Frame(frame) => {
                if config.log_frames {
                    debug!(?frame, "inbound frame");
                }
                emit(events, ClientEvent::Raw(frame.clone()));

                match frame {
                    InboundFrame::Pong => keepalive.pong_received(),

                    InboundFrame::Reconnect => {
                        info!("server requested reconnect");
                        return CloseReason::ReconnectFrame;
                    }

                    InboundFrame::Response(response) => {
                        match table.complete(&response.nonce, response.error) {
                            Some(resolution) => apply_resolution(
                                events,
                                registry,
                                bootstrap_nonce,
                                &response.nonce,
                                resolution,
                            ),
                            None => {
                                warn!(nonce = %response.nonce, "response for unknown token");
                                emit(
                                    events,
                                    ClientEvent::Error(ErrorEvent::new(
                                        ErrorOrigin::Response,
                                        "unknown token",
                                    )),
                                );
                            }
                        }
                    }

                    InboundFrame::Message(message) => match classify(&message) {
                        Classification::Event(event) => {
                            emit(events, ClientEvent::Event(event));
                        }
                        Classification::Dropped => {}
                        Classification::Malformed(error) => {
                            emit(
                                events,
                                ClientEvent::Error(ErrorEvent::with_topic(
                                    ErrorOrigin::Classifier,
                                    error.to_string(),
                                    message.topic,
                                )),
                            );
                        }
                    },
                }
            }

            SelectOutcome::FrameError(error) => {
                warn!(%error, "discarding undecodable frame");
                emit(
                    events,
                    ClientEvent::Error(ErrorEvent::new(ErrorOrigin::Frame, error.to_string())),
                );
            }

            SelectOutcome::TransportError(error) => {
                warn!(%error, "socket error");
                emit(
                    events,
                    ClientEvent::Error(ErrorEvent::new(ErrorOrigin::Socket, error.to_string())),
                );
                return CloseReason::SocketClosed;
            }

            SelectOutcome::SocketClosed => {
                info!("socket closed");
                return CloseReason::SocketClosed;
            }

            SelectOutcome::Command(Command::Listen { topics, reply }) => {
                let (_, frame) = table.issue(
                    OperationKind::Listen,
                    topics,
                    OperationReply::Caller(reply),
                );
                if let Err(error) = send_frame(&mut socket, &frame, events).await {
                    // The operation stays pending; its deadline settles it.
                    return socket_write_failed(events, error);
                }
            }

            SelectOutcome::Command(Command::Unlisten { topics, reply }) => {
                let (_, frame) = table.issue(
                    OperationKind::Unlisten,
                    topics,
                    OperationReply::Caller(reply),
                );
                if let Err(error) = send_frame(&mut socket, &frame, events).await {
                    return socket_write_failed(events, error);
                }
            }

            SelectOutcome::Command(Command::ActiveTopics { reply }) => {
                let _ = reply.send(registry.snapshot());
            }

            SelectOutcome::Command(Command::Shutdown) | SelectOutcome::CommandsClosed => {
                let _ = socket.close(None).await;
                return CloseReason::Shutdown;
            }

            SelectOutcome::SendPing => {
                if let Err(error) = send_frame(&mut socket, &OutboundFrame::Ping, events).await {
                    return socket_write_failed(events, error);
                }
                keepalive.ping_sent();
                debug!("keepalive ping sent");
            }

            SelectOutcome::PongTimeout => {
                warn!("keepalive unacknowledged, forcing reconnect");
                return CloseReason::KeepaliveTimeout;
            }

            SelectOutcome::OperationExpired(nonce) => {
                if let Some(resolution) = table.expire(&nonce) {
                    warn!(%nonce, "operation deadline fired");
                    apply_resolution(events, registry, bootstrap_nonce, &nonce, resolution);
                }
            }
        }
    }
}

fn socket_write_failed(events: &EventSender, error: tungstenite::Error) -> CloseReason {
    warn!(%error, "socket write failed");
    emit(
        events,
        ClientEvent::Error(ErrorEvent::new(ErrorOrigin::Socket, error.to_string())),
    );
    CloseReason::SocketClosed
}
