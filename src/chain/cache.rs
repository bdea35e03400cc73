// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::blocks::{Tipset, TipsetKey};
use crate::shim::clock::ChainEpoch;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The cache holds no tipsets.
    #[error("cache is empty")]
    Empty,
    /// Tipsets must be added with strictly increasing heights.
    #[error("tipset height {got} is not above head height {head}")]
    OutOfOrder { head: ChainEpoch, got: ChainEpoch },
    /// Only the current head can be reverted.
    #[error("reverted tipset {got} is not the head {head}")]
    RevertOutOfOrder { head: TipsetKey, got: TipsetKey },
    /// Nothing is left to revert.
    #[error("cannot revert an empty cache")]
    EmptyRevert,
}

/// Fixed-capacity ring of the most recent tipsets. A tipset leaves the ring
/// only once `confidence` newer tipsets have been added after it, which is
/// when it becomes safe to index.
#[derive(Debug)]
pub struct TipSetCache {
    buffer: Vec<Option<Arc<Tipset>>>,
    idx_head: usize,
    len: usize,
}

impl TipSetCache {
    pub fn new(confidence: usize) -> Self {
        Self {
            buffer: vec![None; confidence],
            idx_head: 0,
            len: 0,
        }
    }

    pub fn confidence(&self) -> usize {
        self.buffer.len()
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn step_back(&self, idx: usize, n: usize) -> usize {
        let cap = self.buffer.len();
        (idx + cap - n % cap) % cap
    }

    fn slot(&self, idx: usize) -> Option<&Arc<Tipset>> {
        self.buffer.get(idx).and_then(Option::as_ref)
    }

    pub fn head(&self) -> Result<Arc<Tipset>, Error> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        self.slot(self.idx_head).cloned().ok_or(Error::Empty)
    }

    pub fn tail(&self) -> Result<Arc<Tipset>, Error> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        self.slot(self.tail_index()).cloned().ok_or(Error::Empty)
    }

    fn tail_index(&self) -> usize {
        self.step_back(self.idx_head, self.len - 1)
    }

    pub fn head_height(&self) -> ChainEpoch {
        self.head().map(|ts| ts.epoch()).unwrap_or_default()
    }

    pub fn tail_height(&self) -> ChainEpoch {
        self.tail().map(|ts| ts.epoch()).unwrap_or_default()
    }

    /// Adds a new head. Returns the tipset pushed out of the confidence
    /// window, if any.
    pub fn add(&mut self, ts: Arc<Tipset>) -> Result<Option<Arc<Tipset>>, Error> {
        let cap = self.buffer.len();
        if cap == 0 {
            return Ok(Some(ts));
        }
        if self.len == 0 {
            self.buffer[self.idx_head] = Some(ts);
            self.len = 1;
            return Ok(None);
        }
        let head = self.head_height();
        if ts.epoch() <= head {
            return Err(Error::OutOfOrder {
                head,
                got: ts.epoch(),
            });
        }
        self.idx_head = (self.idx_head + 1) % cap;
        let old = self.buffer[self.idx_head].replace(ts);
        if self.len < cap {
            self.len += 1;
            return Ok(None);
        }
        Ok(old)
    }

    /// Removes the head, which must be `ts`.
    pub fn revert(&mut self, ts: &Tipset) -> Result<(), Error> {
        if self.len == 0 {
            return Err(Error::EmptyRevert);
        }
        let head = self.head()?;
        if head.key() != ts.key() {
            return Err(Error::RevertOutOfOrder {
                head: head.key().clone(),
                got: ts.key().clone(),
            });
        }
        self.pop_head();
        Ok(())
    }

    fn pop_head(&mut self) {
        self.buffer[self.idx_head] = None;
        self.idx_head = self.step_back(self.idx_head, 1);
        self.len -= 1;
    }

    /// Resets the head to `ts`, dropping every cached tipset above it.
    pub fn set_current(&mut self, ts: Arc<Tipset>) -> Result<(), Error> {
        while self.len > 0 && self.head_height() > ts.epoch() {
            self.pop_head();
        }
        if self.len == 0 {
            return self.add(ts).map(|_| ());
        }
        self.buffer[self.idx_head] = Some(ts);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|slot| *slot = None);
        self.idx_head = 0;
        self.len = 0;
    }

    /// Fills the cache with `head` and its ancestors, oldest first, walking
    /// parent links until the cache is full or genesis is reached.
    pub async fn warm<F, Fut>(&mut self, head: Arc<Tipset>, mut load: F) -> anyhow::Result<()>
    where
        F: FnMut(TipsetKey) -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<Tipset>>>,
    {
        let cap = self.buffer.len();
        debug!(confidence = cap, "warming tipset cache");
        let mut chain = Vec::with_capacity(cap);
        let mut current = head;
        while chain.len() < cap {
            let parents = current.parents().clone();
            let genesis = current.epoch() == 0;
            chain.push(current);
            if genesis || chain.len() == cap {
                break;
            }
            current = load(parents).await?;
        }
        for ts in chain.into_iter().rev() {
            let evicted = self.add(ts)?;
            anyhow::ensure!(evicted.is_none(), "tipset evicted while warming cache");
        }
        Ok(())
    }
}
