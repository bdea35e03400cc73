// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, Error, map_changes, version_of};
use crate::diff::Deferred;
use crate::shim::actors::{ActorCodeRegistry, ActorFamily, power::State};
use crate::source::ActorChange;
use crate::utils::db::BlockstoreExt as _;

pub(super) fn diff<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let current = change
        .current()
        .ok_or(Error::UnexpectedRemoval(ActorFamily::StoragePower))?;
    let raw = store.get_required(&current.head)?;
    let current = State::decode(&raw, version_of(codes, current)?)?;
    let previous = change
        .previous()
        .map(|p| State::load(store, &p.head, version_of(codes, p)?))
        .transpose()?;
    let claims = map_changes(store, previous.as_ref().map(|p| &p.claims), &current.claims)?;
    let mut out = vec![ActorDiff::PowerState(Deferred::new(raw))];
    if !claims.is_empty() {
        out.push(ActorDiff::PowerClaims(claims));
    }
    Ok(out)
}
