// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, Error, array_changes, version_of};
use crate::shim::actors::{ActorCodeRegistry, ActorFamily, market::State};
use crate::source::ActorChange;

pub(super) fn diff<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let current = change
        .current()
        .ok_or(Error::UnexpectedRemoval(ActorFamily::StorageMarket))?;
    let current = State::load(store, &current.head, version_of(codes, current)?)?;
    let previous = change
        .previous()
        .map(|p| State::load(store, &p.head, version_of(codes, p)?))
        .transpose()?;
    let (states, proposals) = rayon::join(
        || array_changes(store, previous.as_ref().map(|p| &p.states), &current.states),
        || {
            array_changes(
                store,
                previous.as_ref().map(|p| &p.proposals),
                &current.proposals,
            )
        },
    );
    let (states, proposals) = (states?, proposals?);
    let mut out = Vec::new();
    if !states.is_empty() {
        out.push(ActorDiff::MarketDealStates(states));
    }
    if !proposals.is_empty() {
        out.push(ActorDiff::MarketDealProposals(proposals));
    }
    Ok(out)
}
