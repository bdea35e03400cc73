// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Content-addressed encoding of the state diffs of one tipset.
//!
//! The root node references the two tipsets and one sub-root per actor
//! family. Per-actor collections (miners, multisigs, raw actors) are HAMTs
//! keyed by address bytes; per-sector collections are HAMTs keyed by
//! unsigned varint sector numbers. Leaf payloads are stored under the raw
//! codec and structural nodes as DAG-CBOR, so identical diffs always
//! produce the same root.

use std::collections::BTreeMap;

use cid::Cid;
use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use integer_encoding::VarInt as _;
use serde::{Serialize, de::DeserializeOwned};

use crate::blocks::{Tipset, TipsetKey};
use crate::diff::{ArrayChange, Deferred, MapChange};
use crate::extract::{ActorDiff, FundsChange, MinerInfoChange, RawActorChange, SectorStatusChange};
use crate::shim::address::Address;
use crate::shim::clock::ChainEpoch;
use crate::shim::version::ActorVersion;
use crate::utils::db::{BlockstoreExt as _, CborStoreExt as _};

const HAMT_BIT_WIDTH: u32 = 5;

#[derive(Debug, Clone, Default)]
pub struct MinerDiff {
    pub info: Option<MinerInfoChange>,
    pub pre_commits: Vec<ArrayChange>,
    pub sectors: Vec<ArrayChange>,
    pub sector_status: Option<SectorStatusChange>,
    pub funds: Option<FundsChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketDiff {
    pub deal_states: Vec<ArrayChange>,
    pub deal_proposals: Vec<ArrayChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerDiff {
    pub claims: Vec<MapChange>,
    /// Encoded power actor state, present when the actor changed.
    pub state: Option<Deferred>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifregDiff {
    pub verifiers: Vec<MapChange>,
    pub clients: Vec<MapChange>,
}

/// Every state diff extracted for one tipset.
#[derive(Debug, Clone)]
pub struct DiffContainer {
    pub current: TipsetKey,
    pub current_height: ChainEpoch,
    pub executed: TipsetKey,
    pub executed_height: ChainEpoch,
    pub actor_version: ActorVersion,
    pub miners: BTreeMap<Address, MinerDiff>,
    pub market: Option<MarketDiff>,
    pub power: Option<PowerDiff>,
    /// Encoded reward actor state.
    pub reward: Option<Deferred>,
    pub raw: BTreeMap<Address, RawActorChange>,
    pub init: Vec<MapChange>,
    pub verifreg: Option<VerifregDiff>,
    pub multisigs: BTreeMap<Address, Vec<MapChange>>,
}

impl DiffContainer {
    pub fn new(current: &Tipset, executed: &Tipset, actor_version: ActorVersion) -> Self {
        Self {
            current: current.key().clone(),
            current_height: current.epoch(),
            executed: executed.key().clone(),
            executed_height: executed.epoch(),
            actor_version,
            miners: BTreeMap::new(),
            market: None,
            power: None,
            reward: None,
            raw: BTreeMap::new(),
            init: Vec::new(),
            verifreg: None,
            multisigs: BTreeMap::new(),
        }
    }

    /// Files one sub-diff of `address` under its family.
    pub fn insert(&mut self, address: Address, diff: ActorDiff) {
        match diff {
            ActorDiff::MinerInfo(info) => self.miners.entry(address).or_default().info = Some(info),
            ActorDiff::MinerPreCommits(changes) => {
                self.miners.entry(address).or_default().pre_commits = changes
            }
            ActorDiff::MinerSectors(changes) => {
                self.miners.entry(address).or_default().sectors = changes
            }
            ActorDiff::MinerSectorStatus(status) => {
                self.miners.entry(address).or_default().sector_status = Some(status)
            }
            ActorDiff::MinerFunds(funds) => {
                self.miners.entry(address).or_default().funds = Some(funds)
            }
            ActorDiff::MarketDealStates(changes) => {
                self.market.get_or_insert_with(Default::default).deal_states = changes
            }
            ActorDiff::MarketDealProposals(changes) => {
                self.market.get_or_insert_with(Default::default).deal_proposals = changes
            }
            ActorDiff::PowerClaims(changes) => {
                self.power.get_or_insert_with(Default::default).claims = changes
            }
            ActorDiff::PowerState(state) => {
                self.power.get_or_insert_with(Default::default).state = Some(state)
            }
            ActorDiff::Reward(state) => self.reward = Some(state),
            ActorDiff::Raw(change) => {
                self.raw.insert(address, change);
            }
            ActorDiff::InitAddresses(changes) => self.init = changes,
            ActorDiff::Verifiers(changes) => {
                self.verifreg.get_or_insert_with(Default::default).verifiers = changes
            }
            ActorDiff::VerifiedClients(changes) => {
                self.verifreg.get_or_insert_with(Default::default).clients = changes
            }
            ActorDiff::MultisigTransactions(changes) => {
                self.multisigs.insert(address, changes);
            }
        }
    }

    /// Writes the container and returns its root.
    pub fn save<BS: Blockstore>(&self, store: &BS) -> anyhow::Result<Cid> {
        let miners = save_by_address(store, &self.miners, |diff| save_miner(store, diff))?;
        let market = self
            .market
            .as_ref()
            .map(|m| {
                store.put_cbor_default(&MarketNode {
                    deal_states: put_list(store, &m.deal_states)?,
                    deal_proposals: put_list(store, &m.deal_proposals)?,
                })
            })
            .transpose()?;
        let power = self
            .power
            .as_ref()
            .map(|p| {
                store.put_cbor_default(&PowerNode {
                    claims: put_list(store, &p.claims)?,
                    state: p.state.as_ref().map(|s| put_leaf(store, s)).transpose()?,
                })
            })
            .transpose()?;
        let reward = self
            .reward
            .as_ref()
            .map(|r| put_leaf(store, r))
            .transpose()?;
        let raw = save_by_address(store, &self.raw, |change| Ok(change.clone()))?;
        let init = put_list(store, &self.init)?;
        let verifreg = self
            .verifreg
            .as_ref()
            .map(|v| {
                store.put_cbor_default(&VerifregNode {
                    verifiers: put_list(store, &v.verifiers)?,
                    clients: put_list(store, &v.clients)?,
                })
            })
            .transpose()?;
        let multisigs = save_by_address(store, &self.multisigs, |changes| {
            put_leaf(store, changes)
        })?;
        store.put_cbor_default(&RootNode {
            current: self.current.clone(),
            current_height: self.current_height,
            executed: self.executed.clone(),
            executed_height: self.executed_height,
            actor_version: self.actor_version,
            miners,
            market,
            power,
            reward,
            raw,
            init,
            verifreg,
            multisigs,
        })
    }

    /// Reads back a container written by [`DiffContainer::save`].
    pub fn load<BS: Blockstore>(store: &BS, root: &Cid) -> anyhow::Result<Self> {
        let node: RootNode = store.get_cbor_required(root)?;
        let miners = load_by_address(store, node.miners.as_ref(), |n: &MinerNode| {
            load_miner(store, n)
        })?;
        let market = node
            .market
            .map(|cid| -> anyhow::Result<_> {
                let n: MarketNode = store.get_cbor_required(&cid)?;
                Ok(MarketDiff {
                    deal_states: get_list(store, n.deal_states.as_ref())?,
                    deal_proposals: get_list(store, n.deal_proposals.as_ref())?,
                })
            })
            .transpose()?;
        let power = node
            .power
            .map(|cid| -> anyhow::Result<_> {
                let n: PowerNode = store.get_cbor_required(&cid)?;
                Ok(PowerDiff {
                    claims: get_list(store, n.claims.as_ref())?,
                    state: n.state.map(|c| get_leaf(store, &c)).transpose()?,
                })
            })
            .transpose()?;
        let reward = node.reward.map(|c| get_leaf(store, &c)).transpose()?;
        let raw = load_by_address(store, node.raw.as_ref(), |c: &RawActorChange| Ok(c.clone()))?;
        let init = get_list(store, node.init.as_ref())?;
        let verifreg = node
            .verifreg
            .map(|cid| -> anyhow::Result<_> {
                let n: VerifregNode = store.get_cbor_required(&cid)?;
                Ok(VerifregDiff {
                    verifiers: get_list(store, n.verifiers.as_ref())?,
                    clients: get_list(store, n.clients.as_ref())?,
                })
            })
            .transpose()?;
        let multisigs = load_by_address(store, node.multisigs.as_ref(), |c: &Cid| {
            get_leaf(store, c)
        })?;
        Ok(Self {
            current: node.current,
            current_height: node.current_height,
            executed: node.executed,
            executed_height: node.executed_height,
            actor_version: node.actor_version,
            miners,
            market,
            power,
            reward,
            raw,
            init,
            verifreg,
            multisigs,
        })
    }
}

#[derive(Serialize_tuple, Deserialize_tuple)]
struct RootNode {
    current: TipsetKey,
    current_height: ChainEpoch,
    executed: TipsetKey,
    executed_height: ChainEpoch,
    actor_version: ActorVersion,
    miners: Option<Cid>,
    market: Option<Cid>,
    power: Option<Cid>,
    reward: Option<Cid>,
    raw: Option<Cid>,
    init: Option<Cid>,
    verifreg: Option<Cid>,
    multisigs: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
struct MinerNode {
    info: Option<Cid>,
    pre_commits: Option<Cid>,
    sectors: Option<Cid>,
    sector_status: Option<Cid>,
    funds: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple)]
struct MarketNode {
    deal_states: Option<Cid>,
    deal_proposals: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple)]
struct PowerNode {
    claims: Option<Cid>,
    state: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple)]
struct VerifregNode {
    verifiers: Option<Cid>,
    clients: Option<Cid>,
}

fn put_leaf<BS: Blockstore, T: Serialize>(store: &BS, value: &T) -> anyhow::Result<Cid> {
    store.put_raw(&fvm_ipld_encoding::to_vec(value)?)
}

fn get_leaf<BS: Blockstore, T: DeserializeOwned>(store: &BS, cid: &Cid) -> anyhow::Result<T> {
    Ok(fvm_ipld_encoding::from_slice(&store.get_required(cid)?)?)
}

/// Empty lists are not written.
fn put_list<BS: Blockstore, T: Serialize>(store: &BS, items: &[T]) -> anyhow::Result<Option<Cid>> {
    if items.is_empty() {
        return Ok(None);
    }
    put_leaf(store, &items).map(Some)
}

fn get_list<BS: Blockstore, T: DeserializeOwned>(
    store: &BS,
    cid: Option<&Cid>,
) -> anyhow::Result<Vec<T>> {
    cid.map(|c| get_leaf(store, c))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn save_by_address<BS, T, V>(
    store: &BS,
    items: &BTreeMap<Address, T>,
    mut encode: impl FnMut(&T) -> anyhow::Result<V>,
) -> anyhow::Result<Option<Cid>>
where
    BS: Blockstore,
    V: Serialize + DeserializeOwned + PartialEq,
{
    if items.is_empty() {
        return Ok(None);
    }
    let mut hamt = Hamt::<_, V>::new_with_bit_width(store, HAMT_BIT_WIDTH);
    for (address, item) in items {
        hamt.set(BytesKey(address.to_bytes()), encode(item)?)?;
    }
    Ok(Some(hamt.flush()?))
}

fn load_by_address<BS, T, V>(
    store: &BS,
    root: Option<&Cid>,
    mut decode: impl FnMut(&V) -> anyhow::Result<T>,
) -> anyhow::Result<BTreeMap<Address, T>>
where
    BS: Blockstore,
    V: Serialize + DeserializeOwned + PartialEq,
{
    let mut out = BTreeMap::new();
    let Some(root) = root else {
        return Ok(out);
    };
    let hamt = Hamt::<_, V>::load_with_bit_width(root, store, HAMT_BIT_WIDTH)?;
    hamt.for_each(|key, value| {
        out.insert(Address::from_bytes(&key.0)?, decode(value)?);
        Ok(())
    })?;
    Ok(out)
}

fn save_by_sector<BS: Blockstore>(
    store: &BS,
    changes: &[ArrayChange],
) -> anyhow::Result<Option<Cid>> {
    if changes.is_empty() {
        return Ok(None);
    }
    let mut hamt = Hamt::<_, ArrayChange>::new_with_bit_width(store, HAMT_BIT_WIDTH);
    for change in changes {
        hamt.set(BytesKey(change.key.encode_var_vec()), change.clone())?;
    }
    Ok(Some(hamt.flush()?))
}

fn load_by_sector<BS: Blockstore>(
    store: &BS,
    root: Option<&Cid>,
) -> anyhow::Result<Vec<ArrayChange>> {
    let mut out = Vec::new();
    if let Some(root) = root {
        let hamt = Hamt::<_, ArrayChange>::load_with_bit_width(root, store, HAMT_BIT_WIDTH)?;
        hamt.for_each(|_, change| {
            out.push(change.clone());
            Ok(())
        })?;
    }
    out.sort_by_key(|c| c.key);
    Ok(out)
}

fn save_miner<BS: Blockstore>(store: &BS, diff: &MinerDiff) -> anyhow::Result<MinerNode> {
    Ok(MinerNode {
        info: diff.info.as_ref().map(|i| put_leaf(store, i)).transpose()?,
        pre_commits: save_by_sector(store, &diff.pre_commits)?,
        sectors: save_by_sector(store, &diff.sectors)?,
        sector_status: diff
            .sector_status
            .as_ref()
            .map(|s| put_leaf(store, s))
            .transpose()?,
        funds: diff.funds.as_ref().map(|f| put_leaf(store, f)).transpose()?,
    })
}

fn load_miner<BS: Blockstore>(store: &BS, node: &MinerNode) -> anyhow::Result<MinerDiff> {
    Ok(MinerDiff {
        info: node.info.map(|c| get_leaf(store, &c)).transpose()?,
        pre_commits: load_by_sector(store, node.pre_commits.as_ref())?,
        sectors: load_by_sector(store, node.sectors.as_ref())?,
        sector_status: node.sector_status.map(|c| get_leaf(store, &c)).transpose()?,
        funds: node.funds.map(|c| get_leaf(store, &c)).transpose()?,
    })
}
