//! Shared test harness: an in-process PubSub endpoint.
//!
//! `TestServer` accepts real WebSocket connections on a loopback port and
//! serves a scripted version of the protocol: acknowledging LISTEN/UNLISTEN
//! with a configurable error string, answering PINGs, and letting tests
//! push arbitrary frames or drop the connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use twitch_pubsub::{ClientConfig, ClientEvent, EventReceiver, Topic};

const WAIT: Duration = Duration::from_secs(5);

/// Behavior knobs for the scripted server.
#[derive(Clone)]
pub struct ServerBehavior {
    /// Error string for RESPONSE frames; empty means success.
    pub response_error: String,
    /// Never answer LISTEN/UNLISTEN (for timeout tests).
    pub ignore_requests: bool,
    /// Answer PING frames with PONG.
    pub answer_pings: bool,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            response_error: String::new(),
            ignore_requests: false,
            answer_pings: true,
        }
    }
}

enum ServerPush {
    Frame(Value),
    Close,
}

/// One accepted client connection, observable and scriptable from a test.
pub struct ServerConnection {
    received: mpsc::UnboundedReceiver<Value>,
    push: mpsc::UnboundedSender<ServerPush>,
}

impl ServerConnection {
    /// Push one frame to the client.
    pub fn send_frame(&self, frame: Value) {
        let _ = self.push.send(ServerPush::Frame(frame));
    }

    /// Close the connection from the server side.
    pub fn close(&self) {
        let _ = self.push.send(ServerPush::Close);
    }

    /// Next frame the client sent, JSON-decoded.
    pub async fn recv_frame(&mut self) -> Value {
        timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("connection task ended")
    }

    /// Next frame, asserting it is a LISTEN.
    pub async fn expect_listen(&mut self) -> Value {
        let frame = self.recv_frame().await;
        assert_eq!(frame["type"], "LISTEN", "expected LISTEN, got {frame}");
        frame
    }
}

pub struct TestServer {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<ServerConnection>,
}

impl TestServer {
    /// Bind a loopback listener and start accepting connections.
    pub async fn spawn(behavior: ServerBehavior) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (connection_tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (received_tx, received) = mpsc::unbounded_channel();
                let (push_tx, push_rx) = mpsc::unbounded_channel();
                if connection_tx
                    .send(ServerConnection {
                        received,
                        push: push_tx,
                    })
                    .is_err()
                {
                    break;
                }
                tokio::spawn(serve_connection(
                    stream,
                    behavior.clone(),
                    received_tx,
                    push_rx,
                ));
            }
        });

        Ok(Self { addr, connections })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for the next client connection.
    pub async fn next_connection(&mut self) -> ServerConnection {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("listener task ended")
    }

    /// Assert that no new connection arrives within `within`.
    pub async fn expect_no_connection(&mut self, within: Duration) {
        assert!(
            timeout(within, self.connections.recv()).await.is_err(),
            "unexpected new connection"
        );
    }
}

async fn serve_connection(
    stream: TcpStream,
    behavior: ServerBehavior,
    received: mpsc::UnboundedSender<Value>,
    mut push: mpsc::UnboundedReceiver<ServerPush>,
) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let reply = scripted_reply(&behavior, &frame);
                    let _ = received.send(frame);
                    if let Some(reply) = reply {
                        if sink.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },

            command = push.recv() => match command {
                Some(ServerPush::Frame(frame)) => {
                    if sink.send(Message::Text(frame.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(ServerPush::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

fn scripted_reply(behavior: &ServerBehavior, frame: &Value) -> Option<Value> {
    match frame["type"].as_str() {
        Some("PING") if behavior.answer_pings => Some(json!({"type": "PONG"})),
        Some("LISTEN" | "UNLISTEN") if !behavior.ignore_requests => Some(json!({
            "type": "RESPONSE",
            "nonce": frame["nonce"],
            "error": behavior.response_error,
        })),
        _ => None,
    }
}

/// Client config pointed at the test server, with test-friendly timings.
pub fn test_config(server: &TestServer, topics: Vec<Topic>) -> ClientConfig {
    let mut config = ClientConfig::new(topics);
    config.endpoint = server.url();
    config.reconnect_delay = Duration::from_millis(100);
    config
}

/// Next event from the client, with a deadline.
pub async fn next_event(events: &mut EventReceiver) -> ClientEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a client event")
        .expect("session ended")
}

/// Skip events until one matches.
pub async fn wait_for(
    events: &mut EventReceiver,
    mut matches: impl FnMut(&ClientEvent) -> bool,
) -> ClientEvent {
    loop {
        let event = next_event(events).await;
        if matches(&event) {
            return event;
        }
    }
}
