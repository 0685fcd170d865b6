//! Session actor: connection lifecycle, keepalive, reconnection.
//!
//! One spawned task owns the socket, the correlation table, the topic
//! registry, and the keepalive state. Client handles talk to it over a
//! command channel; consumers observe it through the event stream. Every
//! socket signal and timer is serialized through the task's select loops,
//! so none of this state needs locking.

mod event_loop;
mod keepalive;

use std::collections::VecDeque;
use std::time::Duration;

use pubsub_proto::Topic;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::correlation::{CorrelationTable, OperationKind, OperationReply, Resolution};
use crate::error::{ErrorEvent, ErrorOrigin, OperationError};
use crate::events::{ClientEvent, EventSender};
use crate::registry::TopicRegistry;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle states. Exactly one session holds the current
/// state; `Terminated` is entered only by explicit shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
    Terminated,
}

/// Requests from the client handle.
pub(crate) enum Command {
    Listen {
        topics: Vec<Topic>,
        reply: oneshot::Sender<Result<(), OperationError>>,
    },
    Unlisten {
        topics: Vec<Topic>,
        reply: oneshot::Sender<Result<(), OperationError>>,
    },
    ActiveTopics {
        reply: oneshot::Sender<Vec<String>>,
    },
    Shutdown,
}

/// Why the open-connection loop ended.
enum CloseReason {
    /// The socket closed, errored, or a write failed.
    SocketClosed,
    /// The server sent a RECONNECT frame.
    ReconnectFrame,
    /// A keepalive PING went unacknowledged.
    KeepaliveTimeout,
    /// Explicit shutdown, or every client handle was dropped.
    Shutdown,
}

#[derive(PartialEq, Eq)]
enum WaitOutcome {
    Reconnect,
    Shutdown,
}

/// A listen/unlisten request parked while no connection is open, drained
/// in order right after the next bootstrap replay.
struct DeferredOperation {
    kind: OperationKind,
    topics: Vec<Topic>,
    reply: OperationReply,
}

pub(crate) struct Session {
    config: ClientConfig,
    state: ConnectionState,
    /// Socket-close reconnect cycles since the last successful open.
    attempts: u32,
    table: CorrelationTable,
    registry: TopicRegistry,
    deferred: VecDeque<DeferredOperation>,
    /// Nonce of the first LISTEN of the current bootstrap replay.
    bootstrap_nonce: Option<String>,
    events: EventSender,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        events: EventSender,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            table: CorrelationTable::new(config.operation_timeout),
            registry: TopicRegistry::new(config.initial_topics.clone()),
            state: ConnectionState::Disconnected,
            attempts: 0,
            deferred: VecDeque::new(),
            bootstrap_nonce: None,
            events,
            commands,
            config,
        }
    }

    /// Drive the connect / keepalive / reconnect cycle until shutdown.
    pub async fn run(mut self) {
        loop {
            self.transition(ConnectionState::Connecting);
            let close = match connect_async(self.config.endpoint.as_str()).await {
                Ok((socket, _)) => {
                    self.transition(ConnectionState::Open);
                    self.attempts = 0;
                    event_loop::run_open(&mut self, socket).await
                }
                Err(error) => {
                    warn!(%error, endpoint = %self.config.endpoint, "connect failed");
                    emit(
                        &self.events,
                        ClientEvent::Error(ErrorEvent::new(
                            ErrorOrigin::Connect,
                            error.to_string(),
                        )),
                    );
                    CloseReason::SocketClosed
                }
            };

            let delay = match close {
                CloseReason::Shutdown => {
                    self.transition(ConnectionState::Terminated);
                    return;
                }
                CloseReason::SocketClosed => {
                    emit(&self.events, ClientEvent::Disconnected);
                    if !self.config.reconnect {
                        self.transition(ConnectionState::Disconnected);
                        return;
                    }
                    let delay = close_delay(self.attempts);
                    self.attempts += 1;
                    delay
                }
                // Server-requested reconnects and dead keepalives retry on
                // a fixed delay, independent of the attempt counter.
                CloseReason::ReconnectFrame | CloseReason::KeepaliveTimeout => {
                    self.config.reconnect_delay
                }
            };

            emit(&self.events, ClientEvent::Reconnecting);
            self.transition(ConnectionState::Reconnecting);
            if self.wait_before_reconnect(delay).await == WaitOutcome::Shutdown {
                self.transition(ConnectionState::Terminated);
                return;
            }
        }
    }

    /// Sleep out a reconnect delay without going deaf: client commands are
    /// parked for the next connection and operation deadlines keep firing.
    async fn wait_before_reconnect(&mut self, delay: Duration) -> WaitOutcome {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        let Self {
            commands,
            table,
            registry,
            deferred,
            bootstrap_nonce,
            events,
            ..
        } = self;

        loop {
            tokio::select! {
                _ = &mut sleep => return WaitOutcome::Reconnect,

                command = commands.recv() => match command {
                    None | Some(Command::Shutdown) => return WaitOutcome::Shutdown,
                    Some(Command::ActiveTopics { reply }) => {
                        let _ = reply.send(registry.snapshot());
                    }
                    Some(Command::Listen { topics, reply }) => {
                        deferred.push_back(DeferredOperation {
                            kind: OperationKind::Listen,
                            topics,
                            reply: OperationReply::Caller(reply),
                        });
                    }
                    Some(Command::Unlisten { topics, reply }) => {
                        deferred.push_back(DeferredOperation {
                            kind: OperationKind::Unlisten,
                            topics,
                            reply: OperationReply::Caller(reply),
                        });
                    }
                },

                // Operations issued before the disconnect are left in the
                // table on purpose; their own deadlines expire them.
                nonce = table.next_expired() => {
                    if let Some(resolution) = table.expire(&nonce) {
                        warn!(%nonce, "operation deadline fired while disconnected");
                        apply_resolution(events, registry, bootstrap_nonce, &nonce, resolution);
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "connection state");
            self.state = next;
        }
    }
}

/// Socket-close reconnects back off linearly with the attempt counter; the
/// first close retries immediately.
fn close_delay(attempts: u32) -> Duration {
    Duration::from_millis(1000 * u64::from(attempts))
}

fn emit(events: &EventSender, event: ClientEvent) {
    // The consumer dropping its receiver must not wedge the session.
    let _ = events.send(event);
}

/// Fold a resolved operation into registry state and consumer signals.
///
/// Successful operations update the active set. The bootstrap nonce gets
/// its reporting-only special case: success announces `Connected`, failure
/// announces a bootstrap error plus `Disconnected`. Failures of other
/// internally-issued operations surface as error signals; caller-issued
/// failures already reached their caller through the reply channel.
fn apply_resolution(
    events: &EventSender,
    registry: &mut TopicRegistry,
    bootstrap_nonce: &mut Option<String>,
    nonce: &str,
    resolution: Resolution,
) {
    if resolution.outcome.is_ok() {
        registry.confirm(resolution.kind, &resolution.topics);
    }

    let first_topic = resolution.topics.first().map(|t| t.name().to_string());

    if bootstrap_nonce.as_deref() == Some(nonce) {
        *bootstrap_nonce = None;
        match &resolution.outcome {
            Ok(()) => {
                info!("initial topic replay acknowledged");
                emit(events, ClientEvent::Connected);
            }
            Err(error) => {
                warn!(%error, "initial topic replay rejected");
                let mut report = ErrorEvent::new(ErrorOrigin::Bootstrap, error.to_string());
                report.topic = first_topic;
                emit(events, ClientEvent::Error(report));
                emit(events, ClientEvent::Disconnected);
            }
        }
        return;
    }

    if resolution.background {
        if let Err(error) = &resolution.outcome {
            let mut report = ErrorEvent::new(ErrorOrigin::Response, error.to_string());
            report.topic = first_topic;
            emit(events, ClientEvent::Error(report));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_delay_grows_linearly_from_zero() {
        assert_eq!(close_delay(0), Duration::from_millis(0));
        assert_eq!(close_delay(1), Duration::from_millis(1000));
        assert_eq!(close_delay(4), Duration::from_millis(4000));
    }
}
