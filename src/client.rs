//! The consumer-facing client handle.

use pubsub_proto::Topic;
use tokio::sync::{mpsc, oneshot};

use crate::config::{ClientConfig, ConfigError};
use crate::error::OperationError;
use crate::events::EventReceiver;
use crate::session::{Command, Session};

/// Handle to a running PubSub session.
///
/// Cheap to clone; all clones talk to the same session. The session shuts
/// down when [`shutdown`](Self::shutdown) is called or every handle is
/// dropped.
#[derive(Clone)]
pub struct PubSubClient {
    commands: mpsc::UnboundedSender<Command>,
}

impl PubSubClient {
    /// Validate the configuration and spawn the session.
    ///
    /// Returns the handle plus the event stream. Connection establishment
    /// happens in the background; watch the stream for
    /// [`Connected`](crate::ClientEvent::Connected). Must be called from
    /// within a tokio runtime.
    pub fn connect(config: ClientConfig) -> Result<(Self, EventReceiver), ConfigError> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(Session::new(config, event_tx, command_rx).run());
        Ok((
            Self {
                commands: command_tx,
            },
            event_rx,
        ))
    }

    /// Subscribe to topics; resolves when the server acknowledges.
    ///
    /// One request (and one correlation token) covers the whole batch.
    /// Expect multi-second latency and [`OperationError::Timeout`] under
    /// bad network conditions. Topics subscribed here are NOT replayed
    /// automatically after a reconnect; re-issue them after observing
    /// [`Reconnecting`](crate::ClientEvent::Reconnecting) followed by
    /// [`Connected`](crate::ClientEvent::Connected).
    pub async fn listen(&self, topics: Vec<Topic>) -> Result<(), OperationError> {
        self.request(|reply| Command::Listen {
            topics,
            reply,
        })
        .await
    }

    /// Unsubscribe from topics; resolves when the server acknowledges.
    ///
    /// Succeeding removes every listed topic from the active set whether
    /// or not it was previously confirmed.
    pub async fn unlisten(&self, topics: Vec<Topic>) -> Result<(), OperationError> {
        self.request(|reply| Command::Unlisten {
            topics,
            reply,
        })
        .await
    }

    /// Snapshot of the topic names the server has confirmed active.
    pub async fn active_topics(&self) -> Result<Vec<String>, OperationError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::ActiveTopics { reply })
            .map_err(|_| OperationError::SessionClosed)?;
        outcome.await.map_err(|_| OperationError::SessionClosed)
    }

    /// End the session: close the socket and stop the task.
    ///
    /// Operations still pending resolve
    /// [`SessionClosed`](OperationError::SessionClosed).
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), OperationError>>) -> Command,
    ) -> Result<(), OperationError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| OperationError::SessionClosed)?;
        outcome.await.map_err(|_| OperationError::SessionClosed)?
    }
}
