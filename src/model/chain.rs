// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

/// Network-wide power totals from the power actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainPower {
    pub height: ChainEpoch,
    pub state_root: String,
    pub total_raw_bytes_power: String,
    pub total_raw_bytes_committed: String,
    pub total_qa_bytes_power: String,
    pub total_qa_bytes_committed: String,
    pub total_pledge_collateral: String,
    pub qa_smoothed_position_estimate: String,
    pub qa_smoothed_velocity_estimate: String,
    pub miner_count: i64,
    pub participating_miner_count: i64,
}

/// Block reward parameters from the reward actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReward {
    pub height: ChainEpoch,
    pub state_root: String,
    pub cum_sum_baseline: String,
    pub cum_sum_realized: String,
    pub effective_baseline_power: String,
    pub new_baseline_power: String,
    pub new_reward: String,
    pub new_reward_smoothed_position_estimate: String,
    pub new_reward_smoothed_velocity_estimate: String,
    pub total_mined_reward: String,
    pub effective_network_time: ChainEpoch,
}

/// Token supply breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEconomics {
    pub height: ChainEpoch,
    pub parent_state_root: String,
    pub circulating_fil: String,
    pub vested_fil: String,
    pub mined_fil: String,
    pub burnt_fil: String,
    pub locked_fil: String,
    pub fil_reserve_disbursed: String,
}

/// One epoch of the canonical chain. Null rounds have no tipset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainConsensus {
    pub height: ChainEpoch,
    pub parent_state_root: String,
    pub parent_tipset: String,
    pub tipset: Option<String>,
}

impl_model! {
    ChainPower => ChainPowers,
    ChainReward => ChainRewards,
    ChainEconomics => ChainEconomics,
    ChainConsensus => ChainConsensus,
}
