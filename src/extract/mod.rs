// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Per-actor state diffs. Every actor whose state tree entry changed
//! between an executed tipset and its child is routed to the handler of its
//! family; the results are gathered into a [`DiffContainer`].

mod init;
mod market;
mod miner;
mod multisig;
mod power;
mod raw;
mod reward;
mod verifreg;

use std::collections::BTreeSet;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use rayon::prelude::*;
use strum::{Display, EnumIter};
use tracing::debug;

pub use miner::{FundsChange, MinerInfoChange, SectorStatusChange};
pub use raw::RawActorChange;

use crate::blocks::Tipset;
use crate::container::DiffContainer;
use crate::diff::{
    ArrayChange, ChangeKind, Deferred, HamtShape, MapChange, MapChanges, amt_shape, diff_array,
    diff_map, load_array_entries, load_map_entries,
};
use crate::shim::actors::{ActorCodeRegistry, ActorFamily};
use crate::shim::address::Address;
use crate::shim::version::ActorVersion;
use crate::source::{ActorChange, ActorState};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no built-in actor is registered for code {0}")]
    MissingActorCode(Cid),
    #[error("the {0} actor is a singleton and cannot be removed")]
    UnexpectedRemoval(ActorFamily),
}

/// Groups of state diffs that can be extracted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DiffFamily {
    /// Actor descriptors and raw state of every changed actor.
    Raw,
    Miner,
    Market,
    Power,
    Reward,
    Init,
    VerifiedRegistry,
    Multisig,
}

impl DiffFamily {
    fn of(family: ActorFamily) -> Option<Self> {
        Some(match family {
            ActorFamily::StorageMiner => Self::Miner,
            ActorFamily::StorageMarket => Self::Market,
            ActorFamily::StoragePower => Self::Power,
            ActorFamily::Reward => Self::Reward,
            ActorFamily::Init => Self::Init,
            ActorFamily::VerifiedRegistry => Self::VerifiedRegistry,
            ActorFamily::Multisig => Self::Multisig,
            _ => return None,
        })
    }
}

/// One sub-diff of one actor.
#[derive(Debug, Clone)]
pub enum ActorDiff {
    MinerInfo(MinerInfoChange),
    /// Pre-commits keyed by sector number.
    MinerPreCommits(Vec<ArrayChange>),
    MinerSectors(Vec<ArrayChange>),
    MinerSectorStatus(SectorStatusChange),
    MinerFunds(FundsChange),
    MarketDealStates(Vec<ArrayChange>),
    MarketDealProposals(Vec<ArrayChange>),
    /// Claims keyed by miner address bytes.
    PowerClaims(Vec<MapChange>),
    PowerState(Deferred),
    Reward(Deferred),
    Raw(RawActorChange),
    /// Id assignments keyed by robust address bytes.
    InitAddresses(Vec<MapChange>),
    Verifiers(Vec<MapChange>),
    VerifiedClients(Vec<MapChange>),
    /// Pending transactions keyed by signed varint transaction id.
    MultisigTransactions(Vec<MapChange>),
}

/// Diffs every changed actor and assembles the results.
pub fn extract_state<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    current: &Tipset,
    executed: &Tipset,
    version: ActorVersion,
    changes: &[ActorChange],
    families: &BTreeSet<DiffFamily>,
) -> anyhow::Result<DiffContainer> {
    debug!(
        height = current.epoch(),
        actors = changes.len(),
        %version,
        "extracting actor state diffs"
    );
    let diffs = changes
        .par_iter()
        .map(|change| diff_actor(store, codes, change, families))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut container = DiffContainer::new(current, executed, version);
    for (address, diff) in diffs.into_iter().flatten() {
        container.insert(address, diff);
    }
    Ok(container)
}

fn diff_actor<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    change: &ActorChange,
    families: &BTreeSet<DiffFamily>,
) -> anyhow::Result<Vec<(Address, ActorDiff)>> {
    let mut out = Vec::new();
    if families.contains(&DiffFamily::Raw) {
        out.push(raw::diff(store, change)?);
    }
    if families.iter().all(|f| *f == DiffFamily::Raw) {
        return Ok(wrap(change.address, out));
    }
    let code = change.actor().code;
    let actor = codes.lookup(&code).ok_or(Error::MissingActorCode(code))?;
    let Some(family) = DiffFamily::of(actor.family).filter(|f| families.contains(f)) else {
        return Ok(wrap(change.address, out));
    };
    let diffs = match family {
        DiffFamily::Miner => miner::diff(store, codes, change)?,
        DiffFamily::Market => market::diff(store, codes, change)?,
        DiffFamily::Power => power::diff(store, codes, change)?,
        DiffFamily::Reward => reward::diff(store, change)?,
        DiffFamily::Init => init::diff(store, change)?,
        DiffFamily::VerifiedRegistry => verifreg::diff(store, codes, change)?,
        DiffFamily::Multisig => multisig::diff(store, change)?,
        DiffFamily::Raw => Vec::new(),
    };
    out.extend(diffs);
    Ok(wrap(change.address, out))
}

/// Actor version that wrote `actor`, read from its code CID.
fn version_of(codes: &ActorCodeRegistry, actor: &ActorState) -> anyhow::Result<ActorVersion> {
    codes
        .lookup(&actor.code)
        .map(|builtin| builtin.version)
        .ok_or_else(|| Error::MissingActorCode(actor.code).into())
}

fn wrap(address: Address, diffs: Vec<ActorDiff>) -> Vec<(Address, ActorDiff)> {
    diffs.into_iter().map(|d| (address, d)).collect()
}

/// Diffs two maps; without a previous root every current entry is an addition.
fn map_changes<BS: Blockstore>(
    store: &BS,
    previous: Option<&Cid>,
    current: &Cid,
) -> anyhow::Result<Vec<MapChange>> {
    let shape = HamtShape::default();
    let changes = match previous {
        Some(previous) => diff_map(store, previous, shape, current, shape)?,
        None => {
            let mut changes = MapChanges::default();
            for (key, value) in load_map_entries(store, current, shape)? {
                changes.added.push(MapChange {
                    key,
                    kind: ChangeKind::Add,
                    previous: None,
                    current: Some(Deferred::from_ipld(&value)?),
                });
            }
            changes
        }
    };
    Ok(changes.into_changes().collect())
}

/// Diffs two arrays, reading each layout from its root.
fn array_changes<BS: Blockstore>(
    store: &BS,
    previous: Option<&Cid>,
    current: &Cid,
) -> anyhow::Result<Vec<ArrayChange>> {
    let current_shape = amt_shape(store, current)?;
    match previous {
        Some(previous) => {
            let previous_shape = amt_shape(store, previous)?;
            diff_array(store, previous, previous_shape, current, current_shape)
        }
        None => load_array_entries(store, current, current_shape)?
            .into_iter()
            .map(|(key, value)| {
                Ok(ArrayChange {
                    key,
                    kind: ChangeKind::Add,
                    previous: None,
                    current: Some(Deferred::from_ipld(&value)?),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests;
