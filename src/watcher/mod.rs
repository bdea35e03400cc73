// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Follows the chain head and hands tipsets to an [`Indexer`] once they are
//! `confidence` tipsets deep.

mod metrics;
mod pool;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blocks::Tipset;
use crate::chain::{self, HeadEvent, HeadObserver, TipSetCache};
use crate::indexer::Indexer;
use crate::source::DataSource;
use crate::tasks::{self, Table};
use pool::WorkerPool;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("watcher cancelled")]
    Cancelled,
    #[error("head change stream closed")]
    ObserverClosed,
    #[error("pool size must be positive")]
    ZeroPoolSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Task aliases or table names to produce.
    #[default(tasks::all_tasks())]
    pub tasks: Vec<String>,
    /// Depth a tipset must reach before it is indexed.
    #[default(5)]
    pub confidence: usize,
    /// Maximum number of tipsets indexed concurrently.
    #[default(1)]
    pub pool_size: usize,
    /// Head changes buffered before apply and revert events are dropped.
    #[default(20)]
    pub buffer_size: usize,
}

impl WatcherConfig {
    /// The tables the configured tasks produce.
    pub fn tables(&self) -> anyhow::Result<BTreeSet<Table>> {
        if self.pool_size == 0 {
            return Err(Error::ZeroPoolSize.into());
        }
        Ok(tasks::expand(&self.tasks)?)
    }
}

type Latch = Arc<Mutex<Option<Arc<anyhow::Error>>>>;

pub struct Watcher<S, I> {
    source: Arc<S>,
    indexer: Arc<I>,
    config: WatcherConfig,
    tables: Arc<BTreeSet<Table>>,
    cache: TipSetCache,
    fatal: Latch,
}

impl<S: DataSource, I: Indexer> Watcher<S, I> {
    pub fn new(source: Arc<S>, indexer: Arc<I>, config: WatcherConfig) -> anyhow::Result<Self> {
        let tables = config.tables()?;
        Ok(Self {
            source,
            indexer,
            cache: TipSetCache::new(config.confidence),
            config,
            tables: Arc::new(tables),
            fatal: Latch::default(),
        })
    }

    pub fn cache(&self) -> &TipSetCache {
        &self.cache
    }

    /// Follows the chain until `token` is cancelled, the node stops sending
    /// head changes, or indexing fails. Returns the first indexing error.
    pub async fn run(&mut self, token: CancellationToken) -> anyhow::Result<()> {
        let pool = WorkerPool::new(self.config.pool_size, token.child_token());
        self.fatal.lock().take();
        self.cache = TipSetCache::new(self.config.confidence);
        let observer = Arc::new(HeadObserver::new(self.config.buffer_size));

        let result = self.watch(&observer, &pool, &token).await;
        if let Err(e) = &result {
            error!("watcher stopped: {e:#}");
        }

        observer.cancel(anyhow::anyhow!(Error::Cancelled));
        if let Err(e) = self.source.unobserve(&observer).await {
            warn!("failed to unregister head observer: {e:#}");
        }
        pool.stop().await;
        // Tasks still running above may latch a failure.
        self.fatal.lock().take();
        self.cache.reset();
        record_cache(&self.cache);
        info!("watcher stopped");
        result
    }

    async fn watch(
        &mut self,
        observer: &Arc<HeadObserver>,
        pool: &WorkerPool,
        token: &CancellationToken,
    ) -> anyhow::Result<()> {
        let events = observer.events();
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled.into()),
            started = self.start(observer) => started?,
        }
        record_cache(&self.cache);
        info!(
            head = self.cache.head_height(),
            tail = self.cache.tail_height(),
            "watching chain head"
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Cancelled.into()),
                event = events.recv_async() => match event {
                    Ok(event) => event,
                    Err(_) => {
                        return Err(match observer.err() {
                            Some(err) => anyhow::anyhow!("{err:#}"),
                            None => Error::ObserverClosed.into(),
                        });
                    }
                },
            };
            debug!(kind = event.kind(), "head event");
            self.handle(event, pool).await?;
            record_cache(&self.cache);
        }
    }

    /// Subscribes to head changes and fills the cache back from the head.
    async fn start(&mut self, observer: &Arc<HeadObserver>) -> anyhow::Result<()> {
        let head = self
            .source
            .observe(observer.clone())
            .await
            .context("failed to observe chain head")?;
        observer.emit_current(head.clone()).await?;
        let source = self.source.clone();
        self.cache
            .warm(head, |key| {
                let source = source.clone();
                async move { source.tipset(&key).await }
            })
            .await
            .context("failed to warm tipset cache")?;
        Ok(())
    }

    async fn handle(&mut self, event: HeadEvent, pool: &WorkerPool) -> anyhow::Result<()> {
        match event {
            HeadEvent::Current(ts) => {
                self.cache.set_current(ts.clone())?;
                if self.config.confidence == 0 {
                    self.submit(ts, pool).await?;
                }
            }
            HeadEvent::Apply { to, .. } => match self.cache.add(to) {
                Ok(Some(tail)) => self.submit(tail, pool).await?,
                Ok(None) => {}
                Err(e) => {
                    metrics::OUT_OF_ORDER_ADDS.inc();
                    warn!("ignoring applied tipset: {e}");
                }
            },
            HeadEvent::Revert { from, .. } => match self.cache.revert(&from) {
                Ok(()) => {}
                Err(chain::Error::EmptyRevert) => {
                    metrics::EMPTY_REVERTS.inc();
                    warn!(
                        height = from.epoch(),
                        "reverted tipset is older than the cached chain"
                    );
                }
                Err(e) => warn!("ignoring reverted tipset: {e}"),
            },
        }
        Ok(())
    }

    async fn submit(&self, ts: Arc<Tipset>, pool: &WorkerPool) -> anyhow::Result<()> {
        let latched = self.fatal.lock().clone();
        if let Some(err) = latched {
            return Err(anyhow::anyhow!("{err:#}"));
        }
        let (indexer, tables, fatal) = (
            self.indexer.clone(),
            self.tables.clone(),
            self.fatal.clone(),
        );
        let height = ts.epoch();
        debug!(height, "submitting tipset for indexing");
        pool.submit(async move {
            if let Err(e) = indexer.tipset(ts, &tables).await {
                error!(height, "indexing failed: {e:#}");
                let mut fatal = fatal.lock();
                if fatal.is_none() {
                    *fatal = Some(Arc::new(e));
                }
            }
        })
        .await
    }
}

fn record_cache(cache: &TipSetCache) {
    metrics::CACHE_SIZE.set(cache.size() as i64);
    metrics::CACHE_LEN.set(cache.len() as i64);
    metrics::CACHE_HEAD_HEIGHT.set(cache.head_height());
    metrics::CACHE_TAIL_HEIGHT.set(cache.tail_height());
}
