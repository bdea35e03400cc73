// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The capabilities the indexer needs from a chain node.

mod state_tree;
mod types;

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;

pub use state_tree::{StateRoot, StateTree, diff_state_trees};
pub use types::{
    ActorChange, ActorDelta, ActorState, ActorStateV4, ActorStateV5, BlockMessages, ChainMessage,
    CirculatingSupply, ExecutedMessage, ExecutionTrace, MessageExecution, Receipt,
};

use crate::blocks::{Tipset, TipsetKey};
use crate::chain::HeadObserver;
use crate::shim::actors::{ActorCodeRegistry, ActorFamily, miner};
use crate::shim::clock::ChainEpoch;
use crate::shim::econ::TokenAmount;
use crate::shim::version::NetworkVersion;
use crate::utils::db::BlockstoreExt as _;

/// Method number of window PoSt submissions on miner actors.
const SUBMIT_WINDOWED_POST: u64 = 5;

/// Height from which successful window PoSt messages stopped burning their
/// base fee. The exemption ends with network version 13.
pub const BURN_EXEMPTION_HEIGHT: ChainEpoch = 343_200;

#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    type Store: Blockstore + Send + Sync + 'static;

    /// Content-addressed store holding chain state.
    fn store(&self) -> &Arc<Self::Store>;

    /// Code identifiers of every built-in actor known to the node.
    fn actor_codes(&self) -> &ActorCodeRegistry;

    fn network_version(&self, epoch: ChainEpoch) -> NetworkVersion;

    /// Registers `observer` for head changes and returns the current head.
    async fn observe(&self, observer: Arc<HeadObserver>) -> anyhow::Result<Arc<Tipset>>;

    /// Stops delivering head changes to `observer`. Nodes that cannot
    /// unregister rely on the observer being cancelled instead.
    async fn unobserve(&self, _observer: &Arc<HeadObserver>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>>;

    /// Messages of each block of `ts`, BLS messages first.
    async fn tipset_block_messages(&self, ts: &Tipset) -> anyhow::Result<Vec<BlockMessages>>;

    /// Messages executed in `executed`, deduplicated and in execution order,
    /// with the receipts stored in `current`.
    async fn tipset_message_receipts(
        &self,
        current: &Tipset,
        executed: &Tipset,
    ) -> anyhow::Result<Vec<ExecutedMessage>>;

    /// Execution traces of `executed`, including implicit messages.
    async fn message_executions(
        &self,
        current: &Tipset,
        executed: &Tipset,
    ) -> anyhow::Result<Vec<MessageExecution>>;

    async fn compute_base_fee(&self, ts: &Tipset) -> anyhow::Result<TokenAmount>;

    async fn circulating_supply(&self, ts: &Tipset) -> anyhow::Result<CirculatingSupply>;

    /// Actors whose state tree entries differ between the state `executed`
    /// produced and the state `current` is based on.
    async fn actor_state_changes(
        &self,
        current: &Tipset,
        executed: &Tipset,
    ) -> anyhow::Result<Vec<ActorChange>> {
        let store = self.store().clone();
        let previous = *executed.parent_state();
        let current = *current.parent_state();
        tokio::task::spawn_blocking(move || diff_state_trees(store.as_ref(), &previous, &current))
            .await?
    }

    /// Whether the base fee of `message` is burnt. Successful window PoSt
    /// submissions were exempt between the Claus upgrade and network
    /// version 13.
    fn should_burn(
        &self,
        executed: &Tipset,
        message: &ChainMessage,
        exit_code: u32,
    ) -> anyhow::Result<bool> {
        let epoch = executed.epoch();
        if u32::from(self.network_version(epoch)) > 12
            || epoch <= BURN_EXEMPTION_HEIGHT
            || exit_code != 0
            || message.message.method_num != SUBMIT_WINDOWED_POST
        {
            return Ok(true);
        }
        let tree = StateTree::new(self.store().as_ref(), executed.parent_state())?;
        let Some(actor) = tree.get_actor(&message.message.to)? else {
            return Ok(true);
        };
        let is_miner = self
            .actor_codes()
            .lookup(&actor.code)
            .is_some_and(|b| b.family == ActorFamily::StorageMiner);
        Ok(!is_miner)
    }

    fn miner_load(&self, actor: &ActorState) -> anyhow::Result<miner::State> {
        let builtin = self
            .actor_codes()
            .lookup(&actor.code)
            .with_context(|| format!("no built-in actor is registered for code {}", actor.code))?;
        miner::State::load(self.store().as_ref(), &actor.head, builtin.version)
    }

    fn chain_read_object(&self, cid: &Cid) -> anyhow::Result<Vec<u8>> {
        self.store().get_required(cid)
    }
}
