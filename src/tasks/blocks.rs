// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::Tipset;
use crate::model::{BlockHeader, BlockParent, DrandBlockEntry, Rows};

/// Headers of `current`, their parent links and the beacon rounds they
/// carry.
pub(super) fn extract(current: &Tipset) -> Rows {
    let mut rows = Rows::default();
    for header in current.block_headers() {
        let cid = header.cid().to_string();
        rows.push(BlockHeader {
            height: header.epoch,
            cid: cid.clone(),
            miner: header.miner_address.to_string(),
            parent_weight: header.weight.to_string(),
            parent_base_fee: header.parent_base_fee.atto().to_string(),
            parent_state_root: header.state_root.to_string(),
            win_count: header.win_count(),
            timestamp: header.timestamp,
            fork_signaling: header.fork_signal,
        });
        rows.extend(header.parents.cids().iter().map(|parent| BlockParent {
            height: header.epoch,
            block: cid.clone(),
            parent: parent.to_string(),
        }));
        rows.extend(header.beacon_entries.iter().map(|entry| DrandBlockEntry {
            round: entry.round,
            block: cid.clone(),
        }));
    }
    rows
}
