// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fil_actors_shared::fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fil_actor_miner_state::{v8, v9};
use fvm_ipld_encoding::{BytesDe, strict_bytes};

use super::{decode_by_arity, decode_versioned};
use crate::shim::{
    address::{self, Address},
    bigint::bigint_ser,
    clock::{ChainEpoch, EPOCH_UNDEFINED},
    econ::{self, TokenAmount},
    sector::{DealId, DealWeight, RegisteredProof, SectorNumber, StoragePower},
    version::ActorVersion,
};
use crate::utils::db::BlockstoreExt as _;

/// Number of proving deadlines in a proving period.
pub const WPOST_PERIOD_DEADLINES: usize = 48;

/// Version-neutral view of a miner actor state.
#[derive(Debug, Clone)]
pub struct State {
    pub info: Cid,
    pub pre_commit_deposits: TokenAmount,
    pub locked_funds: TokenAmount,
    pub vesting_funds: Cid,
    pub fee_debt: TokenAmount,
    pub initial_pledge: TokenAmount,
    pub pre_committed_sectors: Cid,
    pub allocated_sectors: Cid,
    pub sectors: Cid,
    pub proving_period_start: ChainEpoch,
    pub current_deadline: u64,
    pub deadlines: Cid,
    pub early_terminations: BitField,
}

/// Miner state of the first generation.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct StateV0 {
    pub info: Cid,
    pub pre_commit_deposits: TokenAmount,
    pub locked_funds: TokenAmount,
    pub vesting_funds: Cid,
    pub initial_pledge: TokenAmount,
    pub pre_committed_sectors: Cid,
    pub pre_committed_sectors_expiry: Cid,
    pub allocated_sectors: Cid,
    pub sectors: Cid,
    pub proving_period_start: ChainEpoch,
    pub current_deadline: u64,
    pub deadlines: Cid,
    pub early_terminations: BitField,
}

/// Miner state of v2 and v3, which track fee debt.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct StateV2 {
    pub info: Cid,
    pub pre_commit_deposits: TokenAmount,
    pub locked_funds: TokenAmount,
    pub vesting_funds: Cid,
    pub fee_debt: TokenAmount,
    pub initial_pledge: TokenAmount,
    pub pre_committed_sectors: Cid,
    pub pre_committed_sectors_expiry: Cid,
    pub allocated_sectors: Cid,
    pub sectors: Cid,
    pub proving_period_start: ChainEpoch,
    pub current_deadline: u64,
    pub deadlines: Cid,
    pub early_terminations: BitField,
}

/// Miner state from v4 onwards, which gates deadline cron.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct StateV4 {
    pub info: Cid,
    pub pre_commit_deposits: TokenAmount,
    pub locked_funds: TokenAmount,
    pub vesting_funds: Cid,
    pub fee_debt: TokenAmount,
    pub initial_pledge: TokenAmount,
    pub pre_committed_sectors: Cid,
    pub pre_committed_sectors_cleanup: Cid,
    pub allocated_sectors: Cid,
    pub sectors: Cid,
    pub proving_period_start: ChainEpoch,
    pub current_deadline: u64,
    pub deadlines: Cid,
    pub early_terminations: BitField,
    pub deadline_cron_active: bool,
}

impl From<StateV0> for State {
    fn from(s: StateV0) -> Self {
        Self {
            info: s.info,
            pre_commit_deposits: s.pre_commit_deposits,
            locked_funds: s.locked_funds,
            vesting_funds: s.vesting_funds,
            fee_debt: TokenAmount::default(),
            initial_pledge: s.initial_pledge,
            pre_committed_sectors: s.pre_committed_sectors,
            allocated_sectors: s.allocated_sectors,
            sectors: s.sectors,
            proving_period_start: s.proving_period_start,
            current_deadline: s.current_deadline,
            deadlines: s.deadlines,
            early_terminations: s.early_terminations,
        }
    }
}

impl From<StateV2> for State {
    fn from(s: StateV2) -> Self {
        Self {
            info: s.info,
            pre_commit_deposits: s.pre_commit_deposits,
            locked_funds: s.locked_funds,
            vesting_funds: s.vesting_funds,
            fee_debt: s.fee_debt,
            initial_pledge: s.initial_pledge,
            pre_committed_sectors: s.pre_committed_sectors,
            allocated_sectors: s.allocated_sectors,
            sectors: s.sectors,
            proving_period_start: s.proving_period_start,
            current_deadline: s.current_deadline,
            deadlines: s.deadlines,
            early_terminations: s.early_terminations,
        }
    }
}

impl From<StateV4> for State {
    fn from(s: StateV4) -> Self {
        Self {
            info: s.info,
            pre_commit_deposits: s.pre_commit_deposits,
            locked_funds: s.locked_funds,
            vesting_funds: s.vesting_funds,
            fee_debt: s.fee_debt,
            initial_pledge: s.initial_pledge,
            pre_committed_sectors: s.pre_committed_sectors,
            allocated_sectors: s.allocated_sectors,
            sectors: s.sectors,
            proving_period_start: s.proving_period_start,
            current_deadline: s.current_deadline,
            deadlines: s.deadlines,
            early_terminations: s.early_terminations,
        }
    }
}

macro_rules! upstream_state {
    ($($state:ty),+) => {
        $(
            impl From<$state> for State {
                fn from(s: $state) -> Self {
                    Self {
                        info: s.info,
                        pre_commit_deposits: econ::from_v2(&s.pre_commit_deposits),
                        locked_funds: econ::from_v2(&s.locked_funds),
                        vesting_funds: s.vesting_funds,
                        fee_debt: econ::from_v2(&s.fee_debt),
                        initial_pledge: econ::from_v2(&s.initial_pledge),
                        pre_committed_sectors: s.pre_committed_sectors,
                        allocated_sectors: s.allocated_sectors,
                        sectors: s.sectors,
                        proving_period_start: s.proving_period_start,
                        current_deadline: s.current_deadline,
                        deadlines: s.deadlines,
                        early_terminations: s.early_terminations,
                    }
                }
            }
        )+
    };
}

upstream_state!(v8::State, v9::State);

impl State {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("miner state", version, bytes,
            upstream { V8 => v8::State, V9 => v9::State },
            local {
                13 => StateV0,
                14 => StateV2,
                15 => StateV4,
            }
        )
    }

    pub fn load<BS: Blockstore>(
        store: &BS,
        head: &Cid,
        version: ActorVersion,
    ) -> anyhow::Result<Self> {
        Self::decode(&store.get_required(head)?, version)
    }

    /// Raw encoding of the miner info block.
    pub fn info_bytes<BS: Blockstore>(&self, store: &BS) -> anyhow::Result<Vec<u8>> {
        store.get_required(&self.info)
    }

    pub fn info<BS: Blockstore>(
        &self,
        store: &BS,
        version: ActorVersion,
    ) -> anyhow::Result<MinerInfo> {
        MinerInfo::decode(&self.info_bytes(store)?, version)
    }

    pub fn load_deadlines<BS: Blockstore>(
        &self,
        store: &BS,
        version: ActorVersion,
    ) -> anyhow::Result<Deadlines> {
        let bytes = store.get_required(&self.deadlines)?;
        let due = match version {
            ActorVersion::V8 => fvm_ipld_encoding::from_slice::<v8::Deadlines>(&bytes)?.due,
            ActorVersion::V9 => fvm_ipld_encoding::from_slice::<v9::Deadlines>(&bytes)?.due,
            _ => fvm_ipld_encoding::from_slice::<DeadlinesV0>(&bytes)?.due,
        };
        Ok(Deadlines { due, version })
    }
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct WorkerKeyChange {
    pub new_worker: Address,
    pub effective_at: ChainEpoch,
}

/// Version-neutral view of the static miner info.
#[derive(Debug, Clone, PartialEq)]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    pub control_addresses: Vec<Address>,
    pub pending_worker_key: Option<WorkerKeyChange>,
    pub peer_id: Vec<u8>,
    pub multi_addresses: Vec<Vec<u8>>,
    pub proof_type: RegisteredProof,
    pub sector_size: u64,
    pub window_post_partition_sectors: u64,
    pub consensus_fault_elapsed: ChainEpoch,
    pub pending_owner_address: Option<Address>,
    pub beneficiary: Option<Address>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct MinerInfoV0 {
    pub owner: Address,
    pub worker: Address,
    pub control_addresses: Vec<Address>,
    pub pending_worker_key: Option<WorkerKeyChange>,
    #[serde(with = "strict_bytes")]
    pub peer_id: Vec<u8>,
    pub multi_address: Vec<BytesDe>,
    pub seal_proof_type: RegisteredProof,
    pub sector_size: u64,
    pub window_post_partition_sectors: u64,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct MinerInfoV2 {
    pub owner: Address,
    pub worker: Address,
    pub control_addresses: Vec<Address>,
    pub pending_worker_key: Option<WorkerKeyChange>,
    #[serde(with = "strict_bytes")]
    pub peer_id: Vec<u8>,
    pub multi_address: Vec<BytesDe>,
    pub proof_type: RegisteredProof,
    pub sector_size: u64,
    pub window_post_partition_sectors: u64,
    pub consensus_fault_elapsed: ChainEpoch,
    pub pending_owner_address: Option<Address>,
}

fn multi_addresses(addrs: Vec<BytesDe>) -> Vec<Vec<u8>> {
    addrs.into_iter().map(|BytesDe(bytes)| bytes).collect()
}

impl From<MinerInfoV0> for MinerInfo {
    fn from(i: MinerInfoV0) -> Self {
        Self {
            owner: i.owner,
            worker: i.worker,
            control_addresses: i.control_addresses,
            pending_worker_key: i.pending_worker_key,
            peer_id: i.peer_id,
            multi_addresses: multi_addresses(i.multi_address),
            proof_type: i.seal_proof_type,
            sector_size: i.sector_size,
            window_post_partition_sectors: i.window_post_partition_sectors,
            consensus_fault_elapsed: EPOCH_UNDEFINED,
            pending_owner_address: None,
            beneficiary: None,
        }
    }
}

impl From<MinerInfoV2> for MinerInfo {
    fn from(i: MinerInfoV2) -> Self {
        Self {
            owner: i.owner,
            worker: i.worker,
            control_addresses: i.control_addresses,
            pending_worker_key: i.pending_worker_key,
            peer_id: i.peer_id,
            multi_addresses: multi_addresses(i.multi_address),
            proof_type: i.proof_type,
            sector_size: i.sector_size,
            window_post_partition_sectors: i.window_post_partition_sectors,
            consensus_fault_elapsed: i.consensus_fault_elapsed,
            pending_owner_address: i.pending_owner_address,
            beneficiary: None,
        }
    }
}

fn worker_key_change(
    new_worker: &fvm_shared2::address::Address,
    effective_at: ChainEpoch,
) -> anyhow::Result<WorkerKeyChange> {
    Ok(WorkerKeyChange {
        new_worker: address::from_v2(new_worker)?,
        effective_at,
    })
}

fn addresses(addrs: &[fvm_shared2::address::Address]) -> anyhow::Result<Vec<Address>> {
    addrs.iter().map(address::from_v2).collect()
}

impl TryFrom<v8::MinerInfo> for MinerInfo {
    type Error = anyhow::Error;

    fn try_from(i: v8::MinerInfo) -> anyhow::Result<Self> {
        Ok(Self {
            owner: address::from_v2(&i.owner)?,
            worker: address::from_v2(&i.worker)?,
            control_addresses: addresses(&i.control_addresses)?,
            pending_worker_key: i
                .pending_worker_key
                .map(|k| worker_key_change(&k.new_worker, k.effective_at))
                .transpose()?,
            peer_id: i.peer_id,
            multi_addresses: i.multi_address.into_iter().map(|a| a.0).collect(),
            proof_type: i64::from(i.window_post_proof_type),
            sector_size: i.sector_size as u64,
            window_post_partition_sectors: i.window_post_partition_sectors,
            consensus_fault_elapsed: i.consensus_fault_elapsed,
            pending_owner_address: i
                .pending_owner_address
                .as_ref()
                .map(address::from_v2)
                .transpose()?,
            beneficiary: None,
        })
    }
}

impl TryFrom<v9::MinerInfo> for MinerInfo {
    type Error = anyhow::Error;

    fn try_from(i: v9::MinerInfo) -> anyhow::Result<Self> {
        Ok(Self {
            owner: address::from_v2(&i.owner)?,
            worker: address::from_v2(&i.worker)?,
            control_addresses: addresses(&i.control_addresses)?,
            pending_worker_key: i
                .pending_worker_key
                .map(|k| worker_key_change(&k.new_worker, k.effective_at))
                .transpose()?,
            peer_id: i.peer_id,
            multi_addresses: i.multi_address.into_iter().map(|a| a.0).collect(),
            proof_type: i64::from(i.window_post_proof_type),
            sector_size: i.sector_size as u64,
            window_post_partition_sectors: i.window_post_partition_sectors,
            consensus_fault_elapsed: i.consensus_fault_elapsed,
            pending_owner_address: i
                .pending_owner_address
                .as_ref()
                .map(address::from_v2)
                .transpose()?,
            beneficiary: Some(address::from_v2(&i.beneficiary)?),
        })
    }
}

impl MinerInfo {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("miner info", version, bytes,
            upstream { V8 => v8::MinerInfo, V9 => v9::MinerInfo },
            local {
                9 => MinerInfoV0,
                11 => MinerInfoV2,
            }
        )
    }
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct DeadlinesV0 {
    pub due: Vec<Cid>,
}

/// Deadline roots of a proving period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadlines {
    pub due: Vec<Cid>,
    version: ActorVersion,
}

impl Deadlines {
    pub fn load_deadline<BS: Blockstore>(
        &self,
        store: &BS,
        idx: usize,
    ) -> anyhow::Result<Deadline> {
        let root = self
            .due
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("deadline index {idx} out of range"))?;
        Deadline::decode(&store.get_required(root)?, self.version)
    }

    /// Visits each deadline in index order.
    pub fn for_each<BS: Blockstore>(
        &self,
        store: &BS,
        mut f: impl FnMut(usize, Deadline) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for idx in 0..self.due.len() {
            f(idx, self.load_deadline(store, idx)?)?;
        }
        Ok(())
    }
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq, Default)]
pub struct PowerPair {
    #[serde(with = "bigint_ser")]
    pub raw: StoragePower,
    #[serde(with = "bigint_ser")]
    pub qa: StoragePower,
}

/// Deadline layout up to v2.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct DeadlineV0 {
    pub partitions: Cid,
    pub expirations_epochs: Cid,
    pub post_submissions: BitField,
    pub early_terminations: BitField,
    pub live_sectors: u64,
    pub total_sectors: u64,
    pub faulty_power: PowerPair,
}

/// Deadline layout from v3 onwards, with optimistic window post snapshots.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct DeadlineV3 {
    pub partitions: Cid,
    pub expirations_epochs: Cid,
    pub partitions_posted: BitField,
    pub early_terminations: BitField,
    pub live_sectors: u64,
    pub total_sectors: u64,
    pub faulty_power: PowerPair,
    pub optimistic_post_submissions: Cid,
    pub sectors_snapshot: Cid,
    pub partitions_snapshot: Cid,
    pub optimistic_post_submissions_snapshot: Cid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deadline {
    /// Array of partitions, keyed by partition index.
    pub partitions: Cid,
    pub live_sectors: u64,
    pub total_sectors: u64,
}

impl From<DeadlineV0> for Deadline {
    fn from(d: DeadlineV0) -> Self {
        Self {
            partitions: d.partitions,
            live_sectors: d.live_sectors,
            total_sectors: d.total_sectors,
        }
    }
}

impl From<DeadlineV3> for Deadline {
    fn from(d: DeadlineV3) -> Self {
        Self {
            partitions: d.partitions,
            live_sectors: d.live_sectors,
            total_sectors: d.total_sectors,
        }
    }
}

macro_rules! upstream_deadline {
    ($($deadline:ty),+) => {
        $(
            impl From<$deadline> for Deadline {
                fn from(d: $deadline) -> Self {
                    Self {
                        partitions: d.partitions,
                        live_sectors: d.live_sectors,
                        total_sectors: d.total_sectors,
                    }
                }
            }
        )+
    };
}

upstream_deadline!(v8::Deadline, v9::Deadline);

impl Deadline {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("deadline", version, bytes,
            upstream { V8 => v8::Deadline, V9 => v9::Deadline },
            local {
                7 => DeadlineV0,
                11 => DeadlineV3,
            }
        )
    }
}

/// Partition layout of the first generation.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct PartitionV0 {
    pub sectors: BitField,
    pub faults: BitField,
    pub recoveries: BitField,
    pub terminated: BitField,
    pub expirations_epochs: Cid,
    pub early_terminated: Cid,
    pub live_power: PowerPair,
    pub faulty_power: PowerPair,
    pub recovering_power: PowerPair,
}

/// Partition layout from v2 onwards, which tracks unproven sectors.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone)]
pub struct PartitionV2 {
    pub sectors: BitField,
    pub unproven: BitField,
    pub faults: BitField,
    pub recoveries: BitField,
    pub terminated: BitField,
    pub expirations_epochs: Cid,
    pub early_terminated: Cid,
    pub live_power: PowerPair,
    pub unproven_power: PowerPair,
    pub faulty_power: PowerPair,
    pub recovering_power: PowerPair,
}

#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub sectors: BitField,
    pub unproven: BitField,
    pub faults: BitField,
    pub recoveries: BitField,
    pub terminated: BitField,
}

impl From<PartitionV0> for Partition {
    fn from(p: PartitionV0) -> Self {
        Self {
            sectors: p.sectors,
            unproven: BitField::new(),
            faults: p.faults,
            recoveries: p.recoveries,
            terminated: p.terminated,
        }
    }
}

impl From<PartitionV2> for Partition {
    fn from(p: PartitionV2) -> Self {
        Self {
            sectors: p.sectors,
            unproven: p.unproven,
            faults: p.faults,
            recoveries: p.recoveries,
            terminated: p.terminated,
        }
    }
}

macro_rules! upstream_partition {
    ($($partition:ty),+) => {
        $(
            impl From<$partition> for Partition {
                fn from(p: $partition) -> Self {
                    Self {
                        sectors: p.sectors,
                        unproven: p.unproven,
                        faults: p.faults,
                        recoveries: p.recoveries,
                        terminated: p.terminated,
                    }
                }
            }
        )+
    };
}

upstream_partition!(v8::Partition, v9::Partition);

impl Partition {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("partition", version, bytes,
            upstream { V8 => v8::Partition, V9 => v9::Partition },
            local {
                9 => PartitionV0,
                11 => PartitionV2,
            }
        )
    }

    /// Sectors that are neither terminated nor removed.
    pub fn live_sectors(&self) -> BitField {
        &self.sectors - &self.terminated
    }

    /// Live sectors that are proven and not faulty.
    pub fn active_sectors(&self) -> BitField {
        &(&self.live_sectors() - &self.faults) - &self.unproven
    }
}

/// Version-neutral view of an on-chain sector.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredProof,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealId>,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    pub deal_weight: DealWeight,
    pub verified_deal_weight: DealWeight,
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
    pub replaced_sector_age: Option<ChainEpoch>,
    pub replaced_day_reward: Option<TokenAmount>,
    pub sector_key_cid: Option<Cid>,
    pub simple_qa_power: Option<bool>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct SectorOnChainInfoV0 {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredProof,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealId>,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct SectorOnChainInfoV2 {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredProof,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealId>,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
    pub replaced_sector_age: ChainEpoch,
    pub replaced_day_reward: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct SectorOnChainInfoV7 {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredProof,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealId>,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
    pub replaced_sector_age: ChainEpoch,
    pub replaced_day_reward: TokenAmount,
    pub sector_key_cid: Option<Cid>,
}

impl From<SectorOnChainInfoV0> for SectorOnChainInfo {
    fn from(s: SectorOnChainInfoV0) -> Self {
        Self {
            sector_number: s.sector_number,
            seal_proof: s.seal_proof,
            sealed_cid: s.sealed_cid,
            deal_ids: s.deal_ids,
            activation: s.activation,
            expiration: s.expiration,
            deal_weight: s.deal_weight,
            verified_deal_weight: s.verified_deal_weight,
            initial_pledge: s.initial_pledge,
            expected_day_reward: s.expected_day_reward,
            expected_storage_pledge: s.expected_storage_pledge,
            replaced_sector_age: None,
            replaced_day_reward: None,
            sector_key_cid: None,
            simple_qa_power: None,
        }
    }
}

impl From<SectorOnChainInfoV2> for SectorOnChainInfo {
    fn from(s: SectorOnChainInfoV2) -> Self {
        Self {
            sector_number: s.sector_number,
            seal_proof: s.seal_proof,
            sealed_cid: s.sealed_cid,
            deal_ids: s.deal_ids,
            activation: s.activation,
            expiration: s.expiration,
            deal_weight: s.deal_weight,
            verified_deal_weight: s.verified_deal_weight,
            initial_pledge: s.initial_pledge,
            expected_day_reward: s.expected_day_reward,
            expected_storage_pledge: s.expected_storage_pledge,
            replaced_sector_age: Some(s.replaced_sector_age),
            replaced_day_reward: Some(s.replaced_day_reward),
            sector_key_cid: None,
            simple_qa_power: None,
        }
    }
}

impl From<SectorOnChainInfoV7> for SectorOnChainInfo {
    fn from(s: SectorOnChainInfoV7) -> Self {
        Self {
            sector_number: s.sector_number,
            seal_proof: s.seal_proof,
            sealed_cid: s.sealed_cid,
            deal_ids: s.deal_ids,
            activation: s.activation,
            expiration: s.expiration,
            deal_weight: s.deal_weight,
            verified_deal_weight: s.verified_deal_weight,
            initial_pledge: s.initial_pledge,
            expected_day_reward: s.expected_day_reward,
            expected_storage_pledge: s.expected_storage_pledge,
            replaced_sector_age: Some(s.replaced_sector_age),
            replaced_day_reward: Some(s.replaced_day_reward),
            sector_key_cid: s.sector_key_cid,
            simple_qa_power: None,
        }
    }
}

impl From<v8::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(s: v8::SectorOnChainInfo) -> Self {
        Self {
            sector_number: s.sector_number,
            seal_proof: i64::from(s.seal_proof),
            sealed_cid: s.sealed_cid,
            deal_ids: s.deal_ids,
            activation: s.activation,
            expiration: s.expiration,
            deal_weight: s.deal_weight,
            verified_deal_weight: s.verified_deal_weight,
            initial_pledge: econ::from_v2(&s.initial_pledge),
            expected_day_reward: econ::from_v2(&s.expected_day_reward),
            expected_storage_pledge: econ::from_v2(&s.expected_storage_pledge),
            replaced_sector_age: Some(s.replaced_sector_age),
            replaced_day_reward: Some(econ::from_v2(&s.replaced_day_reward)),
            sector_key_cid: s.sector_key_cid,
            simple_qa_power: None,
        }
    }
}

impl From<v9::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(s: v9::SectorOnChainInfo) -> Self {
        Self {
            sector_number: s.sector_number,
            seal_proof: i64::from(s.seal_proof),
            sealed_cid: s.sealed_cid,
            deal_ids: s.deal_ids,
            activation: s.activation,
            expiration: s.expiration,
            deal_weight: s.deal_weight,
            verified_deal_weight: s.verified_deal_weight,
            initial_pledge: econ::from_v2(&s.initial_pledge),
            expected_day_reward: econ::from_v2(&s.expected_day_reward),
            expected_storage_pledge: econ::from_v2(&s.expected_storage_pledge),
            replaced_sector_age: Some(s.replaced_sector_age),
            replaced_day_reward: Some(econ::from_v2(&s.replaced_day_reward)),
            sector_key_cid: s.sector_key_cid,
            simple_qa_power: Some(s.simple_qa_power),
        }
    }
}

impl SectorOnChainInfo {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("sector", version, bytes,
            upstream {
                V8 => v8::SectorOnChainInfo,
                V9 => v9::SectorOnChainInfo,
            },
            local {
                11 => SectorOnChainInfoV0,
                13 => SectorOnChainInfoV2,
                14 => SectorOnChainInfoV7,
            }
        )
    }

    /// Decodes a sector written by an unknown generation. A v8 sector shares
    /// the v7 encoding.
    pub fn decode_any(bytes: &[u8]) -> anyhow::Result<Self> {
        decode_by_arity!("sector", bytes, {
            11 => SectorOnChainInfoV0,
            13 => SectorOnChainInfoV2,
            14 => SectorOnChainInfoV7,
            15 => v9::SectorOnChainInfo,
        })
    }
}

/// Sector being replaced by a committed-capacity upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceCapacity {
    pub deadline: u64,
    pub partition: u64,
    pub sector: SectorNumber,
}

/// Version-neutral view of pre-commit information.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorPreCommitInfo {
    pub seal_proof: RegisteredProof,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub deal_ids: Vec<DealId>,
    pub expiration: ChainEpoch,
    pub replace_capacity: Option<ReplaceCapacity>,
    pub unsealed_cid: Option<Cid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorPreCommitOnChainInfo {
    pub info: SectorPreCommitInfo,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
    pub deal_weight: Option<DealWeight>,
    pub verified_deal_weight: Option<DealWeight>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct SectorPreCommitInfoV0 {
    pub seal_proof: RegisteredProof,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub deal_ids: Vec<DealId>,
    pub expiration: ChainEpoch,
    pub replace_capacity: bool,
    pub replace_sector_deadline: u64,
    pub replace_sector_partition: u64,
    pub replace_sector_number: SectorNumber,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct SectorPreCommitOnChainInfoV0 {
    pub info: SectorPreCommitInfoV0,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
}

impl From<SectorPreCommitOnChainInfoV0> for SectorPreCommitOnChainInfo {
    fn from(p: SectorPreCommitOnChainInfoV0) -> Self {
        let i = p.info;
        Self {
            info: SectorPreCommitInfo {
                seal_proof: i.seal_proof,
                sector_number: i.sector_number,
                sealed_cid: i.sealed_cid,
                seal_rand_epoch: i.seal_rand_epoch,
                deal_ids: i.deal_ids,
                expiration: i.expiration,
                replace_capacity: i.replace_capacity.then_some(ReplaceCapacity {
                    deadline: i.replace_sector_deadline,
                    partition: i.replace_sector_partition,
                    sector: i.replace_sector_number,
                }),
                unsealed_cid: None,
            },
            pre_commit_deposit: p.pre_commit_deposit,
            pre_commit_epoch: p.pre_commit_epoch,
            deal_weight: Some(p.deal_weight),
            verified_deal_weight: Some(p.verified_deal_weight),
        }
    }
}

impl From<v8::SectorPreCommitOnChainInfo> for SectorPreCommitOnChainInfo {
    fn from(p: v8::SectorPreCommitOnChainInfo) -> Self {
        let i = p.info;
        Self {
            info: SectorPreCommitInfo {
                seal_proof: i64::from(i.seal_proof),
                sector_number: i.sector_number,
                sealed_cid: i.sealed_cid,
                seal_rand_epoch: i.seal_rand_epoch,
                deal_ids: i.deal_ids,
                expiration: i.expiration,
                replace_capacity: i.replace_capacity.then_some(ReplaceCapacity {
                    deadline: i.replace_sector_deadline,
                    partition: i.replace_sector_partition,
                    sector: i.replace_sector_number,
                }),
                unsealed_cid: None,
            },
            pre_commit_deposit: econ::from_v2(&p.pre_commit_deposit),
            pre_commit_epoch: p.pre_commit_epoch,
            deal_weight: Some(p.deal_weight),
            verified_deal_weight: Some(p.verified_deal_weight),
        }
    }
}

impl From<v9::SectorPreCommitOnChainInfo> for SectorPreCommitOnChainInfo {
    fn from(p: v9::SectorPreCommitOnChainInfo) -> Self {
        let i = p.info;
        Self {
            info: SectorPreCommitInfo {
                seal_proof: i64::from(i.seal_proof),
                sector_number: i.sector_number,
                sealed_cid: i.sealed_cid,
                seal_rand_epoch: i.seal_rand_epoch,
                deal_ids: i.deal_ids,
                expiration: i.expiration,
                replace_capacity: None,
                unsealed_cid: i.unsealed_cid.0,
            },
            pre_commit_deposit: econ::from_v2(&p.pre_commit_deposit),
            pre_commit_epoch: p.pre_commit_epoch,
            deal_weight: None,
            verified_deal_weight: None,
        }
    }
}

impl SectorPreCommitOnChainInfo {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("pre-commit", version, bytes,
            upstream {
                V8 => v8::SectorPreCommitOnChainInfo,
                V9 => v9::SectorPreCommitOnChainInfo,
            },
            local { 5 => SectorPreCommitOnChainInfoV0 }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::bigint::BigInt;
    use crate::utils::encoding::raw_cid;

    fn bitfield(bits: &[u64]) -> BitField {
        let mut bf = BitField::new();
        for bit in bits {
            bf.set(*bit);
        }
        bf
    }

    #[test]
    fn sector_layouts_decode_by_arity() {
        let v0 = SectorOnChainInfoV0 {
            sector_number: 7,
            seal_proof: 3,
            sealed_cid: raw_cid(b"sealed"),
            deal_ids: vec![1, 2],
            activation: 10,
            expiration: 1000,
            deal_weight: BigInt::from(5),
            verified_deal_weight: BigInt::from(0),
            initial_pledge: TokenAmount::from_atto(100),
            expected_day_reward: TokenAmount::from_atto(1),
            expected_storage_pledge: TokenAmount::from_atto(2),
        };
        let decoded =
            SectorOnChainInfo::decode(&fvm_ipld_encoding::to_vec(&v0).unwrap(), ActorVersion::V0)
                .unwrap();
        assert_eq!(decoded.sector_number, 7);
        assert_eq!(decoded.sector_key_cid, None);
        assert_eq!(decoded.replaced_sector_age, None);

        let v7 = SectorOnChainInfoV7 {
            sector_number: 8,
            seal_proof: 8,
            sealed_cid: raw_cid(b"sealed"),
            deal_ids: vec![],
            activation: 10,
            expiration: 1000,
            deal_weight: BigInt::from(0),
            verified_deal_weight: BigInt::from(0),
            initial_pledge: TokenAmount::from_atto(100),
            expected_day_reward: TokenAmount::from_atto(1),
            expected_storage_pledge: TokenAmount::from_atto(2),
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::default(),
            sector_key_cid: Some(raw_cid(b"key")),
        };
        let decoded =
            SectorOnChainInfo::decode(&fvm_ipld_encoding::to_vec(&v7).unwrap(), ActorVersion::V7)
                .unwrap();
        assert_eq!(decoded.sector_key_cid, Some(raw_cid(b"key")));
    }

    fn sector_v7() -> SectorOnChainInfoV7 {
        SectorOnChainInfoV7 {
            sector_number: 8,
            seal_proof: 8,
            sealed_cid: raw_cid(b"sealed"),
            deal_ids: vec![3],
            activation: 10,
            expiration: 1000,
            deal_weight: BigInt::from(4),
            verified_deal_weight: BigInt::from(0),
            initial_pledge: TokenAmount::from_atto(100),
            expected_day_reward: TokenAmount::from_atto(1),
            expected_storage_pledge: TokenAmount::from_atto(2),
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::default(),
            sector_key_cid: None,
        }
    }

    #[test]
    fn v8_sectors_decode_through_the_actor_crate() {
        let bytes = fvm_ipld_encoding::to_vec(&sector_v7()).unwrap();
        let local = SectorOnChainInfo::decode(&bytes, ActorVersion::V7).unwrap();
        let upstream = SectorOnChainInfo::decode(&bytes, ActorVersion::V8).unwrap();
        assert_eq!(upstream, local);
        assert_eq!(SectorOnChainInfo::decode_any(&bytes).unwrap(), local);
    }

    #[test]
    fn v9_sectors_carry_simple_qa_power() {
        let v7 = sector_v7();
        let v9 = v9::SectorOnChainInfo {
            sector_number: v7.sector_number,
            seal_proof: fvm_shared2::sector::RegisteredSealProof::from(v7.seal_proof),
            sealed_cid: v7.sealed_cid,
            deal_ids: v7.deal_ids.clone(),
            activation: v7.activation,
            expiration: v7.expiration,
            deal_weight: v7.deal_weight.clone(),
            verified_deal_weight: v7.verified_deal_weight.clone(),
            initial_pledge: fvm_shared2::econ::TokenAmount::from_atto(100),
            expected_day_reward: fvm_shared2::econ::TokenAmount::from_atto(1),
            expected_storage_pledge: fvm_shared2::econ::TokenAmount::from_atto(2),
            replaced_sector_age: 0,
            replaced_day_reward: fvm_shared2::econ::TokenAmount::default(),
            sector_key_cid: None,
            simple_qa_power: true,
        };
        let bytes = fvm_ipld_encoding::to_vec(&v9).unwrap();
        let decoded = SectorOnChainInfo::decode(&bytes, ActorVersion::V9).unwrap();
        assert_eq!(decoded.simple_qa_power, Some(true));
        assert_eq!(decoded.seal_proof, 8);
        assert_eq!(decoded.initial_pledge, TokenAmount::from_atto(100));
        assert_eq!(SectorOnChainInfo::decode_any(&bytes).unwrap(), decoded);
        // The v7 encoding is one field short of a v9 sector.
        assert!(SectorOnChainInfo::decode(&bytes, ActorVersion::V7).is_err());
    }

    #[test]
    fn v8_miner_info_converts_addresses() {
        let info = MinerInfoV2 {
            owner: Address::new_id(1000),
            worker: Address::new_id(1001),
            control_addresses: vec![Address::new_id(1002)],
            pending_worker_key: Some(WorkerKeyChange {
                new_worker: Address::new_id(1003),
                effective_at: 50,
            }),
            peer_id: vec![1, 2, 3],
            multi_address: vec![BytesDe(vec![4, 5])],
            proof_type: 8,
            sector_size: 32 << 30,
            window_post_partition_sectors: 2349,
            consensus_fault_elapsed: -1,
            pending_owner_address: None,
        };
        let bytes = fvm_ipld_encoding::to_vec(&info).unwrap();
        let local = MinerInfo::decode(&bytes, ActorVersion::V7).unwrap();
        let upstream = MinerInfo::decode(&bytes, ActorVersion::V8).unwrap();
        assert_eq!(upstream, local);
        assert_eq!(upstream.worker, Address::new_id(1001));
        assert_eq!(upstream.multi_addresses, vec![vec![4, 5]]);
        assert_eq!(upstream.sector_size, 32 << 30);
    }

    #[test]
    fn unknown_layout_is_reported() {
        let bytes = fvm_ipld_encoding::to_vec(&(1u64, 2u64)).unwrap();
        let err = SectorOnChainInfo::decode(&bytes, ActorVersion::V7).unwrap_err();
        assert!(err.downcast_ref::<crate::shim::actors::UnknownLayout>().is_some());
    }

    #[test]
    fn partition_sector_sets() {
        let partition = Partition {
            sectors: bitfield(&[1, 2, 3, 4, 5]),
            unproven: bitfield(&[5]),
            faults: bitfield(&[2]),
            recoveries: bitfield(&[2]),
            terminated: bitfield(&[1]),
        };
        assert_eq!(
            partition.live_sectors().iter().collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
        assert_eq!(
            partition.active_sectors().iter().collect::<Vec<_>>(),
            vec![3, 4]
        );
    }

    #[test]
    fn precommit_replace_capacity_is_optional() {
        let info = SectorPreCommitOnChainInfoV0 {
            info: SectorPreCommitInfoV0 {
                seal_proof: 3,
                sector_number: 9,
                sealed_cid: raw_cid(b"sealed"),
                seal_rand_epoch: 1,
                deal_ids: vec![],
                expiration: 100,
                replace_capacity: false,
                replace_sector_deadline: 0,
                replace_sector_partition: 0,
                replace_sector_number: 0,
            },
            pre_commit_deposit: TokenAmount::from_atto(10),
            pre_commit_epoch: 5,
            deal_weight: BigInt::from(0),
            verified_deal_weight: BigInt::from(0),
        };
        let decoded = SectorPreCommitOnChainInfo::decode(
            &fvm_ipld_encoding::to_vec(&info).unwrap(),
            ActorVersion::V6,
        )
        .unwrap();
        assert_eq!(decoded.info.replace_capacity, None);
        assert_eq!(decoded.deal_weight, Some(BigInt::from(0)));
    }

    #[test]
    fn v9_pre_commits_record_the_unsealed_cid() {
        let pre_commit = v9::SectorPreCommitOnChainInfo {
            info: v9::SectorPreCommitInfo {
                seal_proof: fvm_shared2::sector::RegisteredSealProof::from(8),
                sector_number: 12,
                sealed_cid: raw_cid(b"sealed"),
                seal_rand_epoch: 40,
                deal_ids: vec![1, 2],
                expiration: 1000,
                unsealed_cid: v9::CompactCommD(Some(raw_cid(b"unsealed"))),
            },
            pre_commit_deposit: fvm_shared2::econ::TokenAmount::from_atto(77),
            pre_commit_epoch: 50,
        };
        let bytes = fvm_ipld_encoding::to_vec(&pre_commit).unwrap();
        let decoded = SectorPreCommitOnChainInfo::decode(&bytes, ActorVersion::V9).unwrap();
        assert_eq!(decoded.info.sector_number, 12);
        assert_eq!(decoded.info.unsealed_cid, Some(raw_cid(b"unsealed")));
        assert_eq!(decoded.pre_commit_deposit, TokenAmount::from_atto(77));
        assert_eq!(decoded.deal_weight, None);
    }
}
