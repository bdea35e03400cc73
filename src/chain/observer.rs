// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::metrics;
use crate::blocks::Tipset;
use crate::metrics::values;

/// A head change reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadEvent {
    /// The head moved forward from `from` to `to`.
    Apply { from: Arc<Tipset>, to: Arc<Tipset> },
    /// The head `from` was undone, leaving `to` as the head.
    Revert { from: Arc<Tipset>, to: Arc<Tipset> },
    /// The node's current head, sent when observation starts.
    Current(Arc<Tipset>),
}

impl HeadEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HeadEvent::Apply { .. } => "apply",
            HeadEvent::Revert { .. } => "revert",
            HeadEvent::Current(_) => "current",
        }
    }
}

#[derive(Default)]
struct Inner {
    tx: Option<flume::Sender<HeadEvent>>,
    rx: Option<flume::Receiver<HeadEvent>>,
    err: Option<Arc<anyhow::Error>>,
}

/// Buffered bridge between the node's head notifications and the single
/// consumer driving the cache. Cancelling latches the first error and
/// closes the channel for good.
pub struct HeadObserver {
    buffer_size: usize,
    inner: Mutex<Inner>,
}

impl HeadObserver {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            inner: Mutex::default(),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn open(&self, inner: &mut Inner) {
        if inner.rx.is_none() {
            // A rendezvous channel would block the initial `Current` forever
            // since the consumer only starts reading after warming the cache.
            let (tx, rx) = flume::bounded(self.buffer_size.max(1));
            if inner.err.is_none() {
                inner.tx = Some(tx);
            }
            inner.rx = Some(rx);
        }
    }

    fn sender(&self) -> anyhow::Result<flume::Sender<HeadEvent>> {
        let mut inner = self.inner.lock();
        if let Some(err) = &inner.err {
            return Err(anyhow::anyhow!(err.clone()));
        }
        self.open(&mut inner);
        inner
            .tx
            .clone()
            .ok_or_else(|| anyhow::anyhow!("head observer is closed"))
    }

    fn closed_error(&self) -> anyhow::Error {
        match self.err() {
            Some(err) => anyhow::anyhow!(err),
            None => anyhow::anyhow!("head observer is closed"),
        }
    }

    fn try_emit(&self, event: HeadEvent) -> anyhow::Result<()> {
        let tx = self.sender()?;
        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(event)) => {
                warn!(
                    kind = event.kind(),
                    buffer_size = self.buffer_size,
                    "head observer buffer is full, dropping event"
                );
                let label = match event {
                    HeadEvent::Revert { .. } => values::REVERT,
                    _ => values::APPLY,
                };
                metrics::OBSERVER_DROPPED_EVENTS.get_or_create(&label).inc();
                Ok(())
            }
            Err(flume::TrySendError::Disconnected(_)) => Err(self.closed_error()),
        }
    }

    pub fn emit_apply(&self, from: Arc<Tipset>, to: Arc<Tipset>) -> anyhow::Result<()> {
        self.try_emit(HeadEvent::Apply { from, to })
    }

    pub fn emit_revert(&self, from: Arc<Tipset>, to: Arc<Tipset>) -> anyhow::Result<()> {
        self.try_emit(HeadEvent::Revert { from, to })
    }

    /// Emits the current head, waiting for buffer space if necessary.
    pub async fn emit_current(&self, ts: Arc<Tipset>) -> anyhow::Result<()> {
        let tx = self.sender()?;
        tx.send_async(HeadEvent::Current(ts))
            .await
            .map_err(|_| self.closed_error())
    }

    /// The consumer side of the channel, created on first use.
    pub fn events(&self) -> flume::Receiver<HeadEvent> {
        let mut inner = self.inner.lock();
        self.open(&mut inner);
        match &inner.rx {
            Some(rx) => rx.clone(),
            None => flume::bounded(0).1,
        }
    }

    /// Closes the channel. Only the first error is kept.
    pub fn cancel(&self, err: anyhow::Error) {
        let mut inner = self.inner.lock();
        if inner.err.is_some() {
            return;
        }
        debug!("cancelling head observer: {err:#}");
        inner.err = Some(Arc::new(err));
        inner.tx = None;
    }

    pub fn err(&self) -> Option<Arc<anyhow::Error>> {
        self.inner.lock().err.clone()
    }
}
