//! Extendable event lifetime.
//!
//! Work handed to [`ExtendableLifetime::wait_until`] runs as its own task, so
//! the code that produced a response never waits on it. The host keeps the
//! event alive until [`ExtendableLifetime::settle`] returns.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinHandle;

use crate::Error;

/// Tracks detached work started while handling one event.
#[derive(Debug, Default)]
pub struct ExtendableLifetime {
    pending: Mutex<Vec<(&'static str, JoinHandle<Result<(), Error>>)>>,
}

impl ExtendableLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` as an independent task tied to this event.
    ///
    /// Failures are reported to the log when the lifetime settles and never
    /// reach whoever is waiting on the event's response.
    pub fn wait_until<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let handle = tokio::spawn(work);
        match self.pending.lock() {
            Ok(mut pending) => pending.push((label, handle)),
            Err(poisoned) => poisoned.into_inner().push((label, handle)),
        }
    }

    /// Number of tasks not yet settled.
    pub fn pending(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Wait for every detached task. Returns how many failed.
    pub async fn settle(&self) -> usize {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut failed = 0;
        for (label, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!(task = label, error = %e, "detached work failed");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(task = label, error = %e, "detached work aborted");
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_settle_waits_for_work() {
        let lifetime = ExtendableLifetime::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        lifetime.wait_until("flag", async move {
            tokio::task::yield_now().await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(lifetime.pending(), 1);
        assert_eq!(lifetime.settle().await, 0);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_counts_failures() {
        let lifetime = ExtendableLifetime::new();
        lifetime.wait_until("ok", async { Ok(()) });
        lifetime.wait_until("bad", async { Err(Error::InvalidInput("boom".into())) });

        assert_eq!(lifetime.settle().await, 1);
    }

    #[tokio::test]
    async fn test_settle_empty() {
        assert_eq!(ExtendableLifetime::new().settle().await, 0);
    }
}
