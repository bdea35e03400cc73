// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::RowKey;
use crate::diff::Deferred;
use crate::model::{ChainReward, Rows};
use crate::shim::actors::reward::State;

pub(super) fn transform(key: &RowKey, state: &Deferred) -> Rows {
    let mut rows = Rows::default();
    rows.push_result("reward state", chain_reward(key, state));
    rows
}

fn chain_reward(key: &RowKey, state: &Deferred) -> anyhow::Result<ChainReward> {
    let s = State::decode(state.bytes())?;
    Ok(ChainReward {
        height: key.height,
        state_root: key.state_root.clone(),
        cum_sum_baseline: s.cumsum_baseline.to_string(),
        cum_sum_realized: s.cumsum_realized.to_string(),
        effective_baseline_power: s.effective_baseline_power.to_string(),
        new_baseline_power: s.this_epoch_baseline_power.to_string(),
        new_reward: s.this_epoch_reward.atto().to_string(),
        new_reward_smoothed_position_estimate: s.this_epoch_reward_smoothed.position.to_string(),
        new_reward_smoothed_velocity_estimate: s.this_epoch_reward_smoothed.velocity.to_string(),
        total_mined_reward: s.total_storage_power_reward.atto().to_string(),
        effective_network_time: s.effective_network_time,
    })
}
