// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;
use strum::{AsRefStr, Display};

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerInfo {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub state_root: String,
    pub owner_id: String,
    pub worker_id: String,
    pub new_worker: Option<String>,
    pub worker_change_epoch: ChainEpoch,
    pub consensus_faulted_elapsed: ChainEpoch,
    pub peer_id: Option<String>,
    pub control_addresses: Vec<String>,
    pub multi_addresses: Vec<String>,
    pub sector_size: u64,
}

/// On-chain sector, as written before actor version 7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerSectorInfo {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub state_root: String,
    pub sealed_cid: String,
    pub activation_epoch: ChainEpoch,
    pub expiration_epoch: ChainEpoch,
    pub deal_weight: String,
    pub verified_deal_weight: String,
    pub initial_pledge: String,
    pub expected_day_reward: String,
    pub expected_storage_pledge: String,
}

/// On-chain sector from actor version 7, which adds snap deals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerSectorInfoV7 {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub state_root: String,
    pub sealed_cid: String,
    pub activation_epoch: ChainEpoch,
    pub expiration_epoch: ChainEpoch,
    pub deal_weight: String,
    pub verified_deal_weight: String,
    pub initial_pledge: String,
    pub expected_day_reward: String,
    pub expected_storage_pledge: String,
    pub sector_key_cid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerPreCommitInfo {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub state_root: String,
    pub sealed_cid: String,
    pub seal_rand_epoch: ChainEpoch,
    pub expiration_epoch: ChainEpoch,
    pub pre_commit_deposit: String,
    pub pre_commit_epoch: ChainEpoch,
    pub deal_weight: String,
    pub verified_deal_weight: String,
    pub is_replace_capacity: bool,
    pub replace_sector_deadline: Option<u64>,
    pub replace_sector_partition: Option<u64>,
    pub replace_sector_number: Option<u64>,
}

/// Pre-commit from actor version 9, which records the unsealed cid and
/// drops deal weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerPreCommitInfoV9 {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub state_root: String,
    pub pre_commit_deposit: String,
    pub pre_commit_epoch: ChainEpoch,
    pub sealed_cid: String,
    pub seal_rand_epoch: ChainEpoch,
    pub expiration_epoch: ChainEpoch,
    pub deal_ids: Vec<u64>,
    pub unsealed_cid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectorEvent {
    #[strum(serialize = "PRECOMMIT_ADDED")]
    #[serde(rename = "PRECOMMIT_ADDED")]
    PreCommitAdded,
    SectorAdded,
    CommitCapacityAdded,
    SectorExtended,
    SectorSnapped,
    SectorTerminated,
    SectorFaulted,
    SectorRecovering,
    SectorRecovered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerSectorEvent {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub state_root: String,
    pub event: SectorEvent,
}

/// Deal packed into a newly added sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerSectorDeal {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub sector_id: u64,
    pub deal_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerLockedFund {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub state_root: String,
    pub locked_funds: String,
    pub initial_pledge: String,
    pub pre_commit_deposits: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerFeeDebt {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub state_root: String,
    pub fee_debt: String,
}

impl_model! {
    MinerInfo => MinerInfos,
    MinerSectorInfo => MinerSectorInfos,
    MinerSectorInfoV7 => MinerSectorInfosV7,
    MinerPreCommitInfo => MinerPreCommitInfos,
    MinerPreCommitInfoV9 => MinerPreCommitInfosV9,
    MinerSectorEvent => MinerSectorEvents,
    MinerSectorDeal => MinerSectorDeals,
    MinerLockedFund => MinerLockedFunds,
    MinerFeeDebt => MinerFeeDebts,
}
