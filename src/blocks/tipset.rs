// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use super::{BlockHeader, Error};
use crate::shim::{bigint::BigInt, clock::ChainEpoch, econ::TokenAmount};
use cid::Cid;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

/// An ordered set of block CIDs identifying a tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKey(Vec<Cid>);

impl TipsetKey {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }

    pub fn cids(&self) -> &[Cid] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Cid>> for TipsetKey {
    fn from(cids: Vec<Cid>) -> Self {
        Self(cids)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(","))
    }
}

/// An immutable set of blocks at the same height with the same parent set.
/// Blocks in a tipset are canonically ordered by ticket size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tipset {
    headers: Vec<BlockHeader>,
    key: TipsetKey,
}

impl Tipset {
    /// Builds a new tipset from a collection of blocks. The blocks must be
    /// distinct, have the same height, the same parent set and the same
    /// parent state root.
    pub fn new(mut headers: Vec<BlockHeader>) -> Result<Self, Error> {
        let first = headers.first().ok_or(Error::NoBlocks)?;
        for header in headers.iter().skip(1) {
            if header.epoch != first.epoch {
                return Err(Error::InvalidTipset(
                    "epochs are not equal".to_string(),
                ));
            }
            if header.parents != first.parents {
                return Err(Error::InvalidTipset(
                    "parent cids are not equal".to_string(),
                ));
            }
            if header.state_root != first.state_root {
                return Err(Error::InvalidTipset(
                    "state_roots are not equal".to_string(),
                ));
            }
        }
        headers.sort_by_cached_key(BlockHeader::tipset_sort_key);
        if headers.iter().map(BlockHeader::cid).duplicates().next().is_some() {
            return Err(Error::InvalidTipset("duplicate blocks".to_string()));
        }
        let key = TipsetKey(headers.iter().map(|h| *h.cid()).collect());
        Ok(Self { headers, key })
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.min_ticket_block().epoch
    }

    pub fn block_headers(&self) -> &[BlockHeader] {
        &self.headers
    }

    pub fn min_ticket_block(&self) -> &BlockHeader {
        // A tipset is never constructed without blocks.
        #[allow(clippy::indexing_slicing)]
        &self.headers[0]
    }

    pub fn key(&self) -> &TipsetKey {
        &self.key
    }

    pub fn cids(&self) -> &[Cid] {
        self.key.cids()
    }

    pub fn parents(&self) -> &TipsetKey {
        &self.min_ticket_block().parents
    }

    pub fn parent_state(&self) -> &Cid {
        &self.min_ticket_block().state_root
    }

    pub fn parent_base_fee(&self) -> &TokenAmount {
        &self.min_ticket_block().parent_base_fee
    }

    pub fn weight(&self) -> &BigInt {
        &self.min_ticket_block().weight
    }

    pub fn min_timestamp(&self) -> u64 {
        self.headers
            .iter()
            .map(|h| h.timestamp)
            .min()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl fmt::Display for Tipset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.key, self.epoch())
    }
}
