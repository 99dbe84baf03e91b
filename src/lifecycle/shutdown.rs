//! Shutdown coordination for the gateway.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;

/// Broadcast handle every listener subscribes to.
///
/// Servers stop accepting on the first trigger and drain in-flight
/// requests; [`Shutdown::drain`] bounds how long that may take.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Listeners still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Run `server` to completion, but once shutdown fires allow it only
    /// `grace` more. Returns `None` when the deadline cut it off.
    pub async fn drain<F: Future>(&self, server: F, grace: Duration) -> Option<F::Output> {
        let rx = self.subscribe();
        tokio::pin!(server);
        tokio::select! {
            out = &mut server => Some(out),
            _ = signalled(rx) => match tokio::time::timeout(grace, server).await {
                Ok(out) => Some(out),
                Err(_) => {
                    tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline passed, abandoning in-flight requests");
                    None
                }
            },
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves when `rx` fires or its sender is dropped.
pub async fn signalled(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        let a = shutdown.subscribe();
        let b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        signalled(a).await;
        signalled(b).await;
    }

    #[tokio::test(start_paused = true)]
    async fn drain_cuts_off_after_grace() {
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.trigger();
        });

        let stuck = std::future::pending::<()>();
        assert_eq!(shutdown.drain(stuck, Duration::from_secs(5)).await, None);

        let quick = async { 7 };
        assert_eq!(shutdown.drain(quick, Duration::from_secs(5)).await, Some(7));
    }
}
