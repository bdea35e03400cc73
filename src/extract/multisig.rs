// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, map_changes};
use crate::shim::actors::multisig::State;
use crate::source::ActorChange;

pub(super) fn diff<BS: Blockstore>(
    store: &BS,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let Some(current) = change.current() else {
        return Ok(Vec::new());
    };
    let current = State::load(store, &current.head)?;
    let previous = change
        .previous()
        .map(|p| State::load(store, &p.head))
        .transpose()?;
    let changes = map_changes(
        store,
        previous.as_ref().map(|p| &p.pending_txs),
        &current.pending_txs,
    )?;
    Ok(if changes.is_empty() {
        Vec::new()
    } else {
        vec![ActorDiff::MultisigTransactions(changes)]
    })
}
