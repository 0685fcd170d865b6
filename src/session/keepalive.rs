//! Keepalive state for one open connection.
//!
//! The session sends a PING on a fixed interval; each PING arms a pong
//! deadline. A PONG disarms it. If the deadline fires first the connection
//! is treated as dead exactly as if the server had asked us to reconnect.
//! State here is per-connection and rebuilt from scratch after every
//! reconnect.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};
use tracing::debug;

pub(super) struct KeepaliveState {
    pong_timeout: Duration,
    last_ping_sent_at: Option<Instant>,
    awaiting_pong: bool,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl KeepaliveState {
    pub fn new(pong_timeout: Duration) -> Self {
        Self {
            pong_timeout,
            last_ping_sent_at: None,
            awaiting_pong: false,
            deadline: None,
        }
    }

    /// Record a sent PING and arm the pong deadline.
    pub fn ping_sent(&mut self) {
        self.last_ping_sent_at = Some(Instant::now());
        self.awaiting_pong = true;
        self.deadline = Some(Box::pin(sleep(self.pong_timeout)));
    }

    /// Record the acknowledgment and disarm the deadline.
    pub fn pong_received(&mut self) {
        if let Some(sent_at) = self.last_ping_sent_at {
            debug!(rtt = ?sent_at.elapsed(), "keepalive acknowledged");
        }
        self.awaiting_pong = false;
        self.deadline = None;
    }

    pub fn awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// Resolves when an armed pong deadline fires; pends forever while no
    /// deadline is armed.
    pub async fn deadline_elapsed(&mut self) {
        match self.deadline.as_mut() {
            Some(deadline) => deadline.as_mut().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_without_a_pong() {
        let mut keepalive = KeepaliveState::new(Duration::from_secs(15));
        keepalive.ping_sent();
        assert!(keepalive.awaiting_pong());

        timeout(Duration::from_secs(16), keepalive.deadline_elapsed())
            .await
            .expect("deadline should fire at 15s");
    }

    #[tokio::test(start_paused = true)]
    async fn pong_disarms_the_deadline() {
        let mut keepalive = KeepaliveState::new(Duration::from_secs(15));
        keepalive.ping_sent();
        keepalive.pong_received();
        assert!(!keepalive.awaiting_pong());

        let fired = timeout(Duration::from_secs(60), keepalive.deadline_elapsed()).await;
        assert!(fired.is_err(), "disarmed deadline must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn unarmed_state_pends() {
        let mut keepalive = KeepaliveState::new(Duration::from_secs(15));
        let fired = timeout(Duration::from_secs(60), keepalive.deadline_elapsed()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ping_after_pong_rearms() {
        let mut keepalive = KeepaliveState::new(Duration::from_secs(15));
        keepalive.ping_sent();
        keepalive.pong_received();
        keepalive.ping_sent();

        timeout(Duration::from_secs(16), keepalive.deadline_elapsed())
            .await
            .expect("rearmed deadline should fire");
    }
}
