// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Extraction tasks and the tables they produce. A task identifier is
//! either a task alias, which enables every table of the task, or a single
//! table name.

mod blocks;
mod consensus;
mod economics;
mod gas;
mod implicit;
mod messages;
mod msapprovals;

use std::collections::BTreeSet;
use std::str::FromStr as _;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

pub use gas::{BLOCK_GAS_TARGET, GasOutputs, compute_gas_outputs, gas_burned};

use crate::blocks::Tipset;
use crate::extract::DiffFamily;
use crate::model::Rows;
use crate::source::DataSource;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown task: {0}")]
    UnknownTask(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Task {
    ActorStatesRaw,
    ActorStatesPower,
    ActorStatesReward,
    ActorStatesMiner,
    ActorStatesInit,
    ActorStatesMarket,
    ActorStatesMultisig,
    ActorStatesVerifreg,
    Blocks,
    Messages,
    ChainEconomics,
    MsApprovals,
    ImplicitMessage,
    Consensus,
}

impl Task {
    pub fn tables(self) -> impl Iterator<Item = Table> {
        Table::iter().filter(move |t| t.task() == Some(self))
    }

    /// Family of actor state diffs the task consumes, if any.
    pub fn diff_family(self) -> Option<DiffFamily> {
        Some(match self {
            Self::ActorStatesRaw => DiffFamily::Raw,
            Self::ActorStatesPower => DiffFamily::Power,
            Self::ActorStatesReward => DiffFamily::Reward,
            Self::ActorStatesMiner => DiffFamily::Miner,
            Self::ActorStatesInit => DiffFamily::Init,
            Self::ActorStatesMarket => DiffFamily::Market,
            Self::ActorStatesMultisig => DiffFamily::Multisig,
            Self::ActorStatesVerifreg => DiffFamily::VerifiedRegistry,
            _ => return None,
        })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumString,
)]
pub enum Table {
    #[strum(serialize = "actors")]
    Actors,
    #[strum(serialize = "actor_states")]
    ActorStates,
    #[strum(serialize = "chain_powers")]
    ChainPowers,
    #[strum(serialize = "power_actor_claims")]
    PowerActorClaims,
    #[strum(serialize = "chain_rewards")]
    ChainRewards,
    #[strum(serialize = "miner_infos")]
    MinerInfos,
    #[strum(serialize = "miner_sector_infos")]
    MinerSectorInfos,
    #[strum(serialize = "miner_sector_infos_v7")]
    MinerSectorInfosV7,
    #[strum(serialize = "miner_pre_commit_infos")]
    MinerPreCommitInfos,
    #[strum(serialize = "miner_pre_commit_infos_v9")]
    MinerPreCommitInfosV9,
    #[strum(serialize = "miner_sector_events")]
    MinerSectorEvents,
    #[strum(serialize = "miner_sector_deals")]
    MinerSectorDeals,
    #[strum(serialize = "miner_locked_funds")]
    MinerLockedFunds,
    #[strum(serialize = "miner_fee_debts")]
    MinerFeeDebts,
    #[strum(serialize = "id_addresses")]
    IdAddresses,
    #[strum(serialize = "market_deal_proposals")]
    MarketDealProposals,
    #[strum(serialize = "market_deal_states")]
    MarketDealStates,
    #[strum(serialize = "multisig_transactions")]
    MultisigTransactions,
    #[strum(serialize = "verified_registry_verifiers")]
    VerifiedRegistryVerifiers,
    #[strum(serialize = "verified_registry_verified_clients")]
    VerifiedRegistryVerifiedClients,
    #[strum(serialize = "block_headers")]
    BlockHeaders,
    #[strum(serialize = "block_parents")]
    BlockParents,
    #[strum(serialize = "drand_block_entries")]
    DrandBlockEntries,
    #[strum(serialize = "messages")]
    Messages,
    #[strum(serialize = "block_messages")]
    BlockMessages,
    #[strum(serialize = "receipts")]
    Receipts,
    #[strum(serialize = "derived_gas_outputs")]
    DerivedGasOutputs,
    #[strum(serialize = "message_gas_economy")]
    MessageGasEconomy,
    #[strum(serialize = "chain_economics")]
    ChainEconomics,
    #[strum(serialize = "multisig_approvals")]
    MultisigApprovals,
    #[strum(serialize = "internal_messages")]
    InternalMessages,
    #[strum(serialize = "vm_messages")]
    VmMessages,
    #[strum(serialize = "chain_consensus")]
    ChainConsensus,
    /// Outcome of every task for every tipset. Always written.
    #[strum(serialize = "visor_processing_reports")]
    ProcessingReports,
}

impl Table {
    /// The task producing this table; processing reports belong to none.
    pub fn task(self) -> Option<Task> {
        use Table::*;
        Some(match self {
            Actors | ActorStates => Task::ActorStatesRaw,
            ChainPowers | PowerActorClaims => Task::ActorStatesPower,
            ChainRewards => Task::ActorStatesReward,
            MinerInfos | MinerSectorInfos | MinerSectorInfosV7 | MinerPreCommitInfos
            | MinerPreCommitInfosV9 | MinerSectorEvents | MinerSectorDeals | MinerLockedFunds
            | MinerFeeDebts => Task::ActorStatesMiner,
            IdAddresses => Task::ActorStatesInit,
            MarketDealProposals | MarketDealStates => Task::ActorStatesMarket,
            MultisigTransactions => Task::ActorStatesMultisig,
            VerifiedRegistryVerifiers | VerifiedRegistryVerifiedClients => {
                Task::ActorStatesVerifreg
            }
            BlockHeaders | BlockParents | DrandBlockEntries => Task::Blocks,
            Messages | BlockMessages | Receipts | DerivedGasOutputs | MessageGasEconomy => {
                Task::Messages
            }
            ChainEconomics => Task::ChainEconomics,
            MultisigApprovals => Task::MsApprovals,
            InternalMessages | VmMessages => Task::ImplicitMessage,
            ChainConsensus => Task::Consensus,
            ProcessingReports => return None,
        })
    }
}

/// Rows of a task that reads the chain rather than actor state diffs.
/// Actor state tasks produce nothing here.
pub async fn extract<S: DataSource>(
    task: Task,
    source: &S,
    current: &Tipset,
    executed: &Tipset,
) -> anyhow::Result<Rows> {
    match task {
        Task::Blocks => Ok(blocks::extract(current)),
        Task::Messages => messages::extract(source, current, executed).await,
        Task::ChainEconomics => economics::extract(source, current).await,
        Task::MsApprovals => msapprovals::extract(source, current, executed).await,
        Task::ImplicitMessage => implicit::extract(source, current, executed).await,
        Task::Consensus => Ok(consensus::extract(current, executed)),
        Task::ActorStatesRaw
        | Task::ActorStatesPower
        | Task::ActorStatesReward
        | Task::ActorStatesMiner
        | Task::ActorStatesInit
        | Task::ActorStatesMarket
        | Task::ActorStatesMultisig
        | Task::ActorStatesVerifreg => Ok(Rows::default()),
    }
}

/// Every task alias.
pub fn all_tasks() -> Vec<String> {
    Task::iter().map(|t| t.to_string()).collect()
}

/// Expands task identifiers into the set of tables to produce.
pub fn expand<S: AsRef<str>>(tokens: &[S]) -> Result<BTreeSet<Table>, Error> {
    let mut tables = BTreeSet::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if let Ok(task) = Task::from_str(token) {
            tables.extend(task.tables());
            continue;
        }
        match Table::from_str(token) {
            Ok(Table::ProcessingReports) | Err(_) => {
                return Err(Error::UnknownTask(token.to_string()));
            }
            Ok(table) => {
                tables.insert(table);
            }
        }
    }
    Ok(tables)
}

/// Tasks with at least one enabled table.
pub fn enabled_tasks(tables: &BTreeSet<Table>) -> BTreeSet<Task> {
    tables.iter().filter_map(|t| t.task()).collect()
}

#[cfg(test)]
mod tests;
