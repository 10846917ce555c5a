//! Detached background work
//!
//! Submit-and-forget task runner: the caller never waits on a submitted
//! task, and a failed or panicking task is logged and dropped.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Handle to the background runner; cheap to clone
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

/// Decrements the in-flight count even if the task panicked
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` detached from the caller
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F, E>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.inner));

        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let _guard = guard;
            match handle.await {
                Ok(Ok(())) => tracing::debug!(task = label, "Background task completed"),
                Ok(Err(e)) => tracing::warn!(task = label, error = %e, "Background task failed"),
                Err(e) if e.is_panic() => {
                    tracing::error!(task = label, "Background task panicked")
                }
                Err(_) => tracing::warn!(task = label, "Background task cancelled"),
            }
        });
    }

    /// Number of submitted tasks not yet finished
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once no submitted task is running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
