// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;

use super::{ActorDiff, Error, map_changes, version_of};
use crate::shim::actors::{ActorCodeRegistry, ActorFamily, verifreg::State};
use crate::source::ActorChange;

pub(super) fn diff<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let current = change
        .current()
        .ok_or(Error::UnexpectedRemoval(ActorFamily::VerifiedRegistry))?;
    let current = State::load(store, &current.head, version_of(codes, current)?)?;
    let previous = change
        .previous()
        .map(|p| State::load(store, &p.head, version_of(codes, p)?))
        .transpose()?;
    let (verifiers, clients) = rayon::join(
        || {
            map_changes(
                store,
                previous.as_ref().map(|p| &p.verifiers),
                &current.verifiers,
            )
        },
        || match &current.verified_clients {
            Some(clients) => map_changes(
                store,
                previous.as_ref().and_then(|p| p.verified_clients.as_ref()),
                clients,
            ),
            None => Ok(Vec::new()),
        },
    );
    let (verifiers, clients) = (verifiers?, clients?);
    let mut out = Vec::new();
    if !verifiers.is_empty() {
        out.push(ActorDiff::Verifiers(verifiers));
    }
    if !clients.is_empty() {
        out.push(ActorDiff::VerifiedClients(clients));
    }
    Ok(out)
}
