// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use ahash::HashMap;
use async_trait::async_trait;
use cid::Cid;
use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};
use parking_lot::Mutex;

use crate::blocks::{BlockHeader, Ticket, Tipset, TipsetKey};
use crate::chain::HeadObserver;
use crate::db::MemoryDB;
use crate::shim::actors::ActorCodeRegistry;
use crate::shim::address::Address;
use crate::shim::clock::ChainEpoch;
use crate::shim::econ::TokenAmount;
use crate::shim::version::NetworkVersion;
use crate::source::{
    ActorState, ActorStateV4, BlockMessages, CirculatingSupply, DataSource, ExecutedMessage,
    MessageExecution, StateRoot,
};
use crate::utils::db::CborStoreExt as _;
use crate::utils::encoding::raw_cid;

fn header(height: ChainEpoch, salt: u64, parents: TipsetKey, state_root: Cid) -> BlockHeader {
    let mut header = BlockHeader::default();
    header.miner_address = Address::new_id(1000 + salt);
    header.ticket = Some(Ticket {
        vrfproof: salt.to_be_bytes().to_vec(),
    });
    header.parents = parents;
    header.epoch = height;
    header.state_root = state_root;
    header.timestamp = 1_598_306_400 + 30 * height as u64;
    header.parent_base_fee = TokenAmount::from_atto(100);
    header
}

/// A single-block tipset at `height`. Different salts give different keys.
pub fn tipset_at(height: ChainEpoch, salt: u64) -> Arc<Tipset> {
    let parents = TipsetKey::new(vec![raw_cid(format!("parent-{height}").as_bytes())]);
    let state_root = raw_cid(format!("state-{height}-{salt}").as_bytes());
    tipset_with(height, salt, parents, state_root)
}

pub fn tipset_with(
    height: ChainEpoch,
    salt: u64,
    parents: TipsetKey,
    state_root: Cid,
) -> Arc<Tipset> {
    let header = header(height, salt, parents, state_root);
    // A single header always forms a valid tipset.
    Arc::new(Tipset::new(vec![header]).unwrap())
}

/// Linked tipsets for every height in `start..=end`.
pub fn chain_of(start: ChainEpoch, end: ChainEpoch) -> Vec<Arc<Tipset>> {
    let mut chain: Vec<Arc<Tipset>> = Vec::new();
    for height in start..=end {
        let ts = match chain.last() {
            Some(parent) => tipset_with(
                height,
                0,
                parent.key().clone(),
                raw_cid(format!("state-{height}-0").as_bytes()),
            ),
            None => tipset_at(height, 0),
        };
        chain.push(ts);
    }
    chain
}

/// Writes a version 4 state tree holding `actors`.
pub fn state_tree(store: &MemoryDB, actors: &[(Address, ActorState)]) -> Cid {
    let mut hamt = Hamt::<_, ActorStateV4>::new_with_bit_width(store, 5);
    for (address, state) in actors {
        hamt.set(BytesKey(address.to_bytes()), state.clone().into())
            .unwrap();
    }
    let actors = hamt.flush().unwrap();
    let info = store.put_cbor_default(&Vec::<u8>::new()).unwrap();
    store
        .put_cbor_default(&StateRoot {
            version: 4,
            actors,
            info,
        })
        .unwrap()
}

/// Chain node backed by memory. Tipsets, messages and traces are looked up
/// by the key of the tipset they belong to.
pub struct MemorySource {
    pub store: Arc<MemoryDB>,
    pub codes: ActorCodeRegistry,
    pub network_version: u32,
    /// Network upgrades as `(height, version)`, ascending. Heights below the
    /// first upgrade run `network_version`.
    pub upgrades: Vec<(ChainEpoch, u32)>,
    pub head: Mutex<Option<Arc<Tipset>>>,
    pub tipsets: Mutex<HashMap<TipsetKey, Arc<Tipset>>>,
    pub block_messages: HashMap<TipsetKey, Vec<BlockMessages>>,
    /// Executed messages, by executed tipset.
    pub receipts: HashMap<TipsetKey, Vec<ExecutedMessage>>,
    /// Execution traces, by executed tipset.
    pub executions: HashMap<TipsetKey, Vec<MessageExecution>>,
    pub next_base_fee: TokenAmount,
    pub supply: CirculatingSupply,
    pub observers: Mutex<Vec<Arc<HeadObserver>>>,
    /// When set, `observe` registers the observer and never returns.
    pub stalled: bool,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            store: Arc::default(),
            codes: ActorCodeRegistry::default(),
            network_version: 15,
            upgrades: Vec::new(),
            head: Mutex::default(),
            tipsets: Mutex::default(),
            block_messages: HashMap::default(),
            receipts: HashMap::default(),
            executions: HashMap::default(),
            next_base_fee: TokenAmount::from_atto(100),
            supply: CirculatingSupply::default(),
            observers: Mutex::default(),
            stalled: false,
        }
    }
}

impl MemorySource {
    pub fn with_chain(chain: &[Arc<Tipset>]) -> Self {
        let source = Self::default();
        for ts in chain {
            source.insert(ts.clone());
        }
        *source.head.lock() = chain.last().cloned();
        source
    }

    pub fn insert(&self, ts: Arc<Tipset>) {
        self.tipsets.lock().insert(ts.key().clone(), ts);
    }

    /// The most recently registered observer.
    pub fn observer(&self) -> Option<Arc<HeadObserver>> {
        self.observers.lock().last().cloned()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    type Store = MemoryDB;

    fn store(&self) -> &Arc<MemoryDB> {
        &self.store
    }

    fn actor_codes(&self) -> &ActorCodeRegistry {
        &self.codes
    }

    fn network_version(&self, epoch: ChainEpoch) -> NetworkVersion {
        let version = self
            .upgrades
            .iter()
            .rev()
            .find(|(height, _)| *height <= epoch)
            .map_or(self.network_version, |(_, version)| *version);
        NetworkVersion::from(version)
    }

    async fn observe(&self, observer: Arc<HeadObserver>) -> anyhow::Result<Arc<Tipset>> {
        self.observers.lock().push(observer);
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.head
            .lock()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no head"))
    }

    async fn tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>> {
        self.tipsets
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("tipset {key} not found"))
    }

    async fn tipset_block_messages(&self, ts: &Tipset) -> anyhow::Result<Vec<BlockMessages>> {
        Ok(self
            .block_messages
            .get(ts.key())
            .cloned()
            .unwrap_or_default())
    }

    async fn tipset_message_receipts(
        &self,
        _current: &Tipset,
        executed: &Tipset,
    ) -> anyhow::Result<Vec<ExecutedMessage>> {
        Ok(self
            .receipts
            .get(executed.key())
            .cloned()
            .unwrap_or_default())
    }

    async fn message_executions(
        &self,
        _current: &Tipset,
        executed: &Tipset,
    ) -> anyhow::Result<Vec<MessageExecution>> {
        Ok(self
            .executions
            .get(executed.key())
            .cloned()
            .unwrap_or_default())
    }

    async fn compute_base_fee(&self, _ts: &Tipset) -> anyhow::Result<TokenAmount> {
        Ok(self.next_base_fee.clone())
    }

    async fn circulating_supply(&self, _ts: &Tipset) -> anyhow::Result<CirculatingSupply> {
        Ok(self.supply.clone())
    }
}
