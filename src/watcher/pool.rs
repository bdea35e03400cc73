// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use super::metrics;

/// Runs at most `size` indexing tasks at a time. At most `size` more may
/// wait for a worker; beyond that, [`WorkerPool::submit`] blocks.
pub(super) struct WorkerPool {
    size: usize,
    workers: Arc<Semaphore>,
    queue: Arc<Semaphore>,
    queued: Arc<AtomicI64>,
    active: Arc<AtomicI64>,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl WorkerPool {
    pub fn new(size: usize, token: CancellationToken) -> Self {
        Self {
            size,
            workers: Arc::new(Semaphore::new(size)),
            queue: Arc::new(Semaphore::new(size)),
            queued: Arc::default(),
            active: Arc::default(),
            tracker: TaskTracker::new(),
            token,
        }
    }

    pub fn queue_depth(&self) -> i64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Queues `task`. Tasks still waiting for a worker when the pool is
    /// cancelled are dropped; running ones are cancelled at their next
    /// suspension point.
    pub async fn submit<F>(&self, task: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let depth = self.queued.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::POOL_QUEUE_DEPTH.set(depth);
        metrics::POOL_ACTIVE_WORKERS.set(self.active());
        if depth > self.size as i64 {
            warn!(
                queue_depth = depth,
                pool_size = self.size,
                "indexing is falling behind the chain"
            );
        }
        let slot = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            slot = self.queue.clone().acquire_owned() => slot.ok(),
        };
        let Some(slot) = slot else {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            anyhow::bail!("worker pool is stopped");
        };

        let (workers, queued, active) = (
            self.workers.clone(),
            self.queued.clone(),
            self.active.clone(),
        );
        let token = self.token.clone();
        self.tracker.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = workers.acquire_owned() => permit.ok(),
            };
            drop(slot);
            metrics::POOL_QUEUE_DEPTH.set(queued.fetch_sub(1, Ordering::Relaxed) - 1);
            let Some(_permit) = permit else {
                return;
            };
            metrics::POOL_ACTIVE_WORKERS.set(active.fetch_add(1, Ordering::Relaxed) + 1);
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!("indexing task cancelled"),
                () = task => {}
            }
            metrics::POOL_ACTIVE_WORKERS.set(active.fetch_sub(1, Ordering::Relaxed) - 1);
        });
        Ok(())
    }

    /// Waits for every submitted task to finish.
    pub async fn stop(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("worker pool stopped");
    }
}
