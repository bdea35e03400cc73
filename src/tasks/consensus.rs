// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::Tipset;
use crate::model::{ChainConsensus, Rows};

/// One row for `current` and one per null round between `executed` and
/// `current`. Null rounds have no tipset.
pub(super) fn extract(current: &Tipset, executed: &Tipset) -> Rows {
    let parent_state_root = current.parent_state().to_string();
    let parent_tipset = executed.key().to_string();
    let mut rows = Rows::default();
    rows.push(ChainConsensus {
        height: current.epoch(),
        parent_state_root: parent_state_root.clone(),
        parent_tipset: parent_tipset.clone(),
        tipset: Some(current.key().to_string()),
    });
    rows.extend(
        (executed.epoch() + 1..current.epoch()).map(|height| ChainConsensus {
            height,
            parent_state_root: parent_state_root.clone(),
            parent_tipset: parent_tipset.clone(),
            tipset: None,
        }),
    );
    rows
}
