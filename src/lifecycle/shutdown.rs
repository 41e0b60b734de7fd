//! Shutdown coordination for the server.
//!
//! # Design Decisions
//! - One broadcast fan-out: the HTTP server and background tasks each hold a receiver
//! - A dropped coordinator counts as a shutdown, so listeners never hang

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and any background task
/// can subscribe to.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Safe to call with no subscribers.
    pub fn trigger(&self) {
        tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
        let _ = self.tx.send(());
    }

    /// Number of subscribers still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Resolve once `rx` sees a shutdown, then log that `component` is draining.
///
/// A closed or lagged channel is treated as a shutdown as well.
pub async fn drain_on(mut rx: broadcast::Receiver<()>, component: &'static str) {
    if let Err(broadcast::error::RecvError::Closed) = rx.recv().await {
        tracing::debug!(component, "Shutdown coordinator dropped");
    }
    tracing::info!(component, "Draining connections");
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
