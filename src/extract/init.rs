// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, Error, map_changes};
use crate::shim::actors::{ActorFamily, init::State};
use crate::source::ActorChange;

pub(super) fn diff<BS: Blockstore>(
    store: &BS,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let current = change
        .current()
        .ok_or(Error::UnexpectedRemoval(ActorFamily::Init))?;
    let current = State::load(store, &current.head)?;
    let previous = change
        .previous()
        .map(|p| State::load(store, &p.head))
        .transpose()?;
    let changes = map_changes(
        store,
        previous.as_ref().map(|p| &p.address_map),
        &current.address_map,
    )?;
    Ok(if changes.is_empty() {
        Vec::new()
    } else {
        vec![ActorDiff::InitAddresses(changes)]
    })
}
