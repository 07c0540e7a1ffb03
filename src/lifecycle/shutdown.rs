//! Shutdown coordination.
//!
//! Live streams never finish on their own, so draining is bounded: once the
//! grace period is over the server task is aborted and its connections close.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

/// How a server task ended after shutdown was triggered.
#[derive(Debug)]
pub enum DrainOutcome<T> {
    Finished(T),
    Panicked(JoinError),
    DeadlineReached,
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
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

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown and wait up to `grace` for `task` to finish.
    pub async fn drain<T>(&self, mut task: JoinHandle<T>, grace: Duration) -> DrainOutcome<T> {
        self.trigger();
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(value)) => DrainOutcome::Finished(value),
            Ok(Err(e)) => DrainOutcome::Panicked(e),
            Err(_) => {
                task.abort();
                DrainOutcome::DeadlineReached
            }
        }
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
    async fn cooperative_task_finishes() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            let _ = rx.recv().await;
            7
        });

        match shutdown.drain(task, Duration::from_secs(1)).await {
            DrainOutcome::Finished(v) => assert_eq!(v, 7),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stuck_task_hits_deadline() {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let outcome = shutdown.drain(task, Duration::from_millis(50)).await;
        assert!(matches!(outcome, DrainOutcome::DeadlineReached));
    }
}
