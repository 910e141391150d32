//! Shutdown fan-out.
//!
//! The HTTP server and the rate limit bucket sweeper each hold a receiver;
//! one [`Shutdown::trigger`] stops both.

use tokio::sync::broadcast;

/// Broadcasts a single stop signal to every background task of the service.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to hand to a task before it is spawned.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscribed task. Safe to call more than once.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no running tasks");
        }
    }

    /// Tasks that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::RateLimitConfig;
    use crate::security::RateLimiterState;

    #[tokio::test]
    async fn test_trigger_stops_server_side_tasks() {
        let shutdown = Shutdown::new();
        let limiter = Arc::new(RateLimiterState::new(&RateLimitConfig::default()));
        let sweeper = limiter.spawn_cleanup_task(
            Duration::from_secs(60),
            Duration::from_secs(300),
            shutdown.subscribe(),
        );
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
        tokio::time::timeout(Duration::from_secs(2), sweeper)
            .await
            .expect("sweeper kept running")
            .unwrap();
        assert_eq!(shutdown.receiver_count(), 1);
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
