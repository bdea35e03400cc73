// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Conversion of a [`DiffContainer`] into flat rows. Transformers only
//! read what the container already holds; per-row failures are collected
//! on the returned [`Rows`] rather than aborting the task.

mod init;
mod market;
mod miner;
mod multisig;
mod power;
mod raw;
mod reward;
mod verifreg;

use crate::blocks::Tipset;
use crate::container::DiffContainer;
use crate::model::Rows;
use crate::shim::clock::ChainEpoch;
use crate::tasks::Task;

/// Key shared by every row of one tipset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub height: ChainEpoch,
    pub state_root: String,
}

impl RowKey {
    pub fn of(ts: &Tipset) -> Self {
        Self {
            height: ts.epoch(),
            state_root: ts.parent_state().to_string(),
        }
    }
}

/// Rows of an actor state task. Other tasks produce nothing here.
pub fn transform(task: Task, current: &Tipset, container: &DiffContainer) -> Rows {
    let key = RowKey::of(current);
    let version = container.actor_version;
    match task {
        Task::ActorStatesRaw => raw::transform(&key, &container.raw),
        Task::ActorStatesMiner => miner::transform(&key, version, &container.miners),
        Task::ActorStatesMarket => container
            .market
            .as_ref()
            .map(|m| market::transform(&key, version, m))
            .unwrap_or_default(),
        Task::ActorStatesPower => container
            .power
            .as_ref()
            .map(|p| power::transform(&key, version, p))
            .unwrap_or_default(),
        Task::ActorStatesReward => container
            .reward
            .as_ref()
            .map(|r| reward::transform(&key, r))
            .unwrap_or_default(),
        Task::ActorStatesInit => init::transform(&key, &container.init),
        Task::ActorStatesVerifreg => container
            .verifreg
            .as_ref()
            .map(|v| verifreg::transform(&key, v))
            .unwrap_or_default(),
        Task::ActorStatesMultisig => multisig::transform(&key, &container.multisigs),
        Task::Blocks
        | Task::Messages
        | Task::ChainEconomics
        | Task::MsApprovals
        | Task::ImplicitMessage
        | Task::Consensus => Rows::default(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::Rows;
    use crate::sink::{BatchWriter, SCHEMA_VERSION};

    pub fn written(rows: &Rows) -> BatchWriter {
        let mut writer = BatchWriter::new(SCHEMA_VERSION);
        rows.write_to(&mut writer).unwrap();
        writer
    }
}
