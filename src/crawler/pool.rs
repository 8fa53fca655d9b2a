//! Shared crawl worker pool
//!
//! One pool serves every crawl run of the process. It bounds the number of
//! tasks fetching or saving at once and carries the cancellation signal
//! used by a stop request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Bounded, cancellable pool shared by all crawl tasks
#[derive(Debug)]
pub struct CrawlPool {
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    size: usize,
}

impl CrawlPool {
    /// Creates a pool allowing `size` tasks to work at once
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            cancel: CancellationToken::new(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a worker slot
    ///
    /// Returns None once the pool has been shut down.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        }
    }

    /// Runs `fut` unless the pool is shut down first
    pub async fn run_cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }

    /// Sleeps for `delay`; returns false if woken by shutdown
    pub async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.is_shut_down();
        }
        self.run_cancellable(tokio::time::sleep(delay)).await.is_some()
    }

    /// Force-stops the pool: pending and future acquisitions fail
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.permits.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
