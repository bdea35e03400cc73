// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fil_actors_shared::fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use integer_encoding::VarInt as _;
use rayon::prelude::*;

use super::{ActorDiff, array_changes, map_changes, version_of};
use crate::diff::{ArrayChange, ChangeKind, Deferred, amt_shape, load_array_entries};
use crate::shim::actors::ActorCodeRegistry;
use crate::shim::actors::miner::{Partition, State};
use crate::shim::econ::TokenAmount;
use crate::shim::version::ActorVersion;
use crate::source::{ActorChange, ActorState};

/// New miner info, recorded when the info block changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct MinerInfoChange {
    pub kind: ChangeKind,
    pub info: Deferred,
}

/// Sectors whose status moved between two states of one miner.
#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct SectorStatusChange {
    /// Sectors that left the live set.
    pub terminated: BitField,
    pub faulted: BitField,
    pub recovering: BitField,
    /// Formerly faulty sectors that are active again.
    pub recovered: BitField,
}

impl SectorStatusChange {
    pub fn is_empty(&self) -> bool {
        self.terminated.is_empty()
            && self.faulted.is_empty()
            && self.recovering.is_empty()
            && self.recovered.is_empty()
    }
}

/// Balances held by a miner, recorded when any of them changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct FundsChange {
    pub locked_funds: TokenAmount,
    pub initial_pledge: TokenAmount,
    pub pre_commit_deposits: TokenAmount,
    pub fee_debt: TokenAmount,
}

impl From<&State> for FundsChange {
    fn from(state: &State) -> Self {
        Self {
            locked_funds: state.locked_funds.clone(),
            initial_pledge: state.initial_pledge.clone(),
            pre_commit_deposits: state.pre_commit_deposits.clone(),
            fee_debt: state.fee_debt.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Info,
    PreCommits,
    Sectors,
    SectorStatus,
    Funds,
}

/// Miner state along with the actor version that wrote it.
struct Versioned {
    state: State,
    version: ActorVersion,
}

pub(super) fn diff<BS: Blockstore + Sync>(
    store: &BS,
    codes: &ActorCodeRegistry,
    change: &ActorChange,
) -> anyhow::Result<Vec<ActorDiff>> {
    let load = |actor: &ActorState| -> anyhow::Result<Versioned> {
        let version = version_of(codes, actor)?;
        Ok(Versioned {
            state: State::load(store, &actor.head, version)?,
            version,
        })
    };
    let Some(current) = change.current().map(&load).transpose()? else {
        return Ok(Vec::new());
    };
    let previous = change.previous().map(&load).transpose()?;
    let previous = previous.as_ref();
    let parts = [
        Part::Info,
        Part::PreCommits,
        Part::Sectors,
        Part::SectorStatus,
        Part::Funds,
    ];
    let diffs = parts
        .into_par_iter()
        .map(|part| {
            let states = previous.map(|p| &p.state);
            match part {
                Part::Info => diff_info(store, states, &current.state),
                Part::PreCommits => diff_pre_commits(store, states, &current.state),
                Part::Sectors => diff_sectors(store, states, &current.state),
                Part::SectorStatus => diff_sector_status(store, previous, &current),
                Part::Funds => Ok(diff_funds(states, &current.state)),
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(diffs.into_iter().flatten().collect())
}

fn diff_info<BS: Blockstore>(
    store: &BS,
    previous: Option<&State>,
    current: &State,
) -> anyhow::Result<Option<ActorDiff>> {
    let kind = match previous {
        None => ChangeKind::Add,
        Some(previous) if previous.info == current.info => return Ok(None),
        Some(_) => ChangeKind::Modify,
    };
    Ok(Some(ActorDiff::MinerInfo(MinerInfoChange {
        kind,
        info: Deferred::new(current.info_bytes(store)?),
    })))
}

/// Pre-commit maps are keyed by unsigned varint sector numbers.
fn sector_number(key: &[u8]) -> anyhow::Result<u64> {
    u64::decode_var(key)
        .map(|(n, _)| n)
        .ok_or_else(|| anyhow::anyhow!("invalid sector number key {}", hex::encode(key)))
}

fn diff_pre_commits<BS: Blockstore>(
    store: &BS,
    previous: Option<&State>,
    current: &State,
) -> anyhow::Result<Option<ActorDiff>> {
    let changes = map_changes(
        store,
        previous.map(|p| &p.pre_committed_sectors),
        &current.pre_committed_sectors,
    )?
    .into_iter()
    .map(|c| {
        Ok(ArrayChange {
            key: sector_number(&c.key)?,
            kind: c.kind,
            previous: c.previous,
            current: c.current,
        })
    })
    .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((!changes.is_empty()).then_some(ActorDiff::MinerPreCommits(changes)))
}

fn diff_sectors<BS: Blockstore>(
    store: &BS,
    previous: Option<&State>,
    current: &State,
) -> anyhow::Result<Option<ActorDiff>> {
    let changes = array_changes(store, previous.map(|p| &p.sectors), &current.sectors)?;
    Ok((!changes.is_empty()).then_some(ActorDiff::MinerSectors(changes)))
}

struct SectorSets {
    live: BitField,
    faults: BitField,
    recoveries: BitField,
    active: BitField,
}

impl SectorSets {
    fn empty() -> Self {
        Self {
            live: BitField::new(),
            faults: BitField::new(),
            recoveries: BitField::new(),
            active: BitField::new(),
        }
    }

    fn load<BS: Blockstore>(store: &BS, miner: &Versioned) -> anyhow::Result<Self> {
        let mut sets = Self::empty();
        let deadlines = miner.state.load_deadlines(store, miner.version)?;
        deadlines.for_each(store, |_, deadline| {
            let shape = amt_shape(store, &deadline.partitions)?;
            for partition in load_array_entries(store, &deadline.partitions, shape)?.values() {
                let bytes = fvm_ipld_encoding::to_vec(partition)?;
                let partition = Partition::decode(&bytes, miner.version)?;
                sets.live = &sets.live | &partition.live_sectors();
                sets.faults = &sets.faults | &partition.faults;
                sets.recoveries = &sets.recoveries | &partition.recoveries;
                sets.active = &sets.active | &partition.active_sectors();
            }
            Ok(())
        })?;
        Ok(sets)
    }
}

fn diff_sector_status<BS: Blockstore>(
    store: &BS,
    previous: Option<&Versioned>,
    current: &Versioned,
) -> anyhow::Result<Option<ActorDiff>> {
    if previous.is_some_and(|p| p.state.deadlines == current.state.deadlines) {
        return Ok(None);
    }
    let before = match previous {
        Some(previous) => SectorSets::load(store, previous)?,
        None => SectorSets::empty(),
    };
    let after = SectorSets::load(store, current)?;
    let status = SectorStatusChange {
        terminated: &before.live - &after.live,
        faulted: &after.faults - &before.faults,
        recovering: &after.recoveries - &before.recoveries,
        recovered: &(&before.faults - &after.faults) & &after.active,
    };
    Ok((!status.is_empty()).then_some(ActorDiff::MinerSectorStatus(status)))
}

fn diff_funds(previous: Option<&State>, current: &State) -> Option<ActorDiff> {
    let funds = FundsChange::from(current);
    match previous {
        Some(previous) if FundsChange::from(previous) == funds => None,
        _ => Some(ActorDiff::MinerFunds(funds)),
    }
}
