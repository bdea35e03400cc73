// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, Error};
use crate::diff::Deferred;
use crate::shim::actors::{ActorFamily, reward::State};
use crate::source::ActorChange;
use crate::utils::db::BlockstoreExt as _;

pub(super) fn diff<BS: Blockstore>(
    store: &BS,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let head = change
        .current()
        .ok_or(Error::UnexpectedRemoval(ActorFamily::Reward))?
        .head;
    let raw = store.get_required(&head)?;
    // Unknown layouts fail the extraction.
    State::decode(&raw)?;
    Ok(vec![ActorDiff::Reward(Deferred::new(raw))])
}
