// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::decode_by_arity;
use super::power::FilterEstimate;
use crate::shim::{
    bigint::{BigInt, bigint_ser},
    clock::ChainEpoch,
    econ::TokenAmount,
    sector::StoragePower,
};
use crate::utils::db::BlockstoreExt as _;

/// Version-neutral view of the reward actor state.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub cumsum_baseline: BigInt,
    pub cumsum_realized: BigInt,
    pub effective_network_time: ChainEpoch,
    pub effective_baseline_power: StoragePower,
    pub this_epoch_reward: TokenAmount,
    pub this_epoch_reward_smoothed: FilterEstimate,
    pub this_epoch_baseline_power: StoragePower,
    pub epoch: ChainEpoch,
    pub total_storage_power_reward: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct StateV0 {
    #[serde(with = "bigint_ser")]
    pub cumsum_baseline: BigInt,
    #[serde(with = "bigint_ser")]
    pub cumsum_realized: BigInt,
    pub effective_network_time: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub effective_baseline_power: StoragePower,
    pub this_epoch_reward: TokenAmount,
    pub this_epoch_reward_smoothed: Option<FilterEstimate>,
    #[serde(with = "bigint_ser")]
    pub this_epoch_baseline_power: StoragePower,
    pub epoch: ChainEpoch,
    pub total_mined: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct StateV2 {
    #[serde(with = "bigint_ser")]
    pub cumsum_baseline: BigInt,
    #[serde(with = "bigint_ser")]
    pub cumsum_realized: BigInt,
    pub effective_network_time: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub effective_baseline_power: StoragePower,
    pub this_epoch_reward: TokenAmount,
    pub this_epoch_reward_smoothed: FilterEstimate,
    #[serde(with = "bigint_ser")]
    pub this_epoch_baseline_power: StoragePower,
    pub epoch: ChainEpoch,
    pub total_storage_power_reward: TokenAmount,
    pub simple_total: TokenAmount,
    pub baseline_total: TokenAmount,
}

impl From<StateV0> for State {
    fn from(s: StateV0) -> Self {
        Self {
            cumsum_baseline: s.cumsum_baseline,
            cumsum_realized: s.cumsum_realized,
            effective_network_time: s.effective_network_time,
            effective_baseline_power: s.effective_baseline_power,
            this_epoch_reward: s.this_epoch_reward,
            this_epoch_reward_smoothed: s.this_epoch_reward_smoothed.unwrap_or_default(),
            this_epoch_baseline_power: s.this_epoch_baseline_power,
            epoch: s.epoch,
            total_storage_power_reward: s.total_mined,
        }
    }
}

impl From<StateV2> for State {
    fn from(s: StateV2) -> Self {
        Self {
            cumsum_baseline: s.cumsum_baseline,
            cumsum_realized: s.cumsum_realized,
            effective_network_time: s.effective_network_time,
            effective_baseline_power: s.effective_baseline_power,
            this_epoch_reward: s.this_epoch_reward,
            this_epoch_reward_smoothed: s.this_epoch_reward_smoothed,
            this_epoch_baseline_power: s.this_epoch_baseline_power,
            epoch: s.epoch,
            total_storage_power_reward: s.total_storage_power_reward,
        }
    }
}

impl State {
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        decode_by_arity!("reward state", bytes, {
            9 => StateV0,
            11 => StateV2,
        })
    }

    pub fn load<BS: Blockstore>(store: &BS, head: &Cid) -> anyhow::Result<Self> {
        Self::decode(&store.get_required(head)?)
    }
}
