//! Shutdown coordination for the hub.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// The broadcast side stops the HTTP server; the token side reaches every
/// session queue, so in-flight waits end instead of running to their timeout.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            token: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn trigger(&self) {
        tracing::info!("Shutdown triggered");
        self.token.cancel();
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
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

    #[tokio::test]
    async fn test_trigger_reaches_subscribers_and_children() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let child = shutdown.token().child_token();

        shutdown.trigger();

        rx.recv().await.unwrap();
        assert!(child.is_cancelled());
        assert!(shutdown.is_triggered());
    }
}
