// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub height: ChainEpoch,
    pub cid: String,
    pub miner: String,
    pub parent_weight: String,
    pub parent_base_fee: String,
    pub parent_state_root: String,
    pub win_count: i64,
    pub timestamp: u64,
    pub fork_signaling: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockParent {
    pub height: ChainEpoch,
    pub block: String,
    pub parent: String,
}

/// Randomness beacon round referenced by a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrandBlockEntry {
    pub round: u64,
    pub block: String,
}

impl_model! {
    BlockHeader => BlockHeaders,
    BlockParent => BlockParents,
    DrandBlockEntry => DrandBlockEntries,
}
