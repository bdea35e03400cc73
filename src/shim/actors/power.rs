// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fil_actor_power_state::{v8, v9};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::decode_versioned;
use crate::shim::{
    bigint::{BigInt, bigint_ser},
    clock::ChainEpoch,
    econ::{self, TokenAmount},
    sector::{RegisteredProof, StoragePower},
    version::ActorVersion,
};
use crate::utils::db::BlockstoreExt as _;

/// Alpha-beta filter estimate of a smoothed quantity.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterEstimate {
    #[serde(with = "bigint_ser")]
    pub position: BigInt,
    #[serde(with = "bigint_ser")]
    pub velocity: BigInt,
}

/// Version-neutral view of the power actor state.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub total_raw_byte_power: StoragePower,
    pub total_bytes_committed: StoragePower,
    pub total_quality_adj_power: StoragePower,
    pub total_qa_bytes_committed: StoragePower,
    pub total_pledge_collateral: TokenAmount,
    pub this_epoch_qa_power_smoothed: FilterEstimate,
    pub miner_count: i64,
    pub miner_above_min_power_count: i64,
    /// Map of claims, keyed by miner address.
    pub claims: Cid,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct StateV0 {
    #[serde(with = "bigint_ser")]
    pub total_raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_bytes_committed: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_quality_adj_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_qa_bytes_committed: StoragePower,
    pub total_pledge_collateral: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub this_epoch_raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub this_epoch_quality_adj_power: StoragePower,
    pub this_epoch_pledge_collateral: TokenAmount,
    pub this_epoch_qa_power_smoothed: Option<FilterEstimate>,
    pub miner_count: i64,
    pub miner_above_min_power_count: i64,
    pub cron_event_queue: Cid,
    pub first_cron_epoch: ChainEpoch,
    pub last_processed_cron_epoch: ChainEpoch,
    pub claims: Cid,
    pub proof_validation_batch: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq)]
pub struct StateV2 {
    #[serde(with = "bigint_ser")]
    pub total_raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_bytes_committed: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_quality_adj_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub total_qa_bytes_committed: StoragePower,
    pub total_pledge_collateral: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub this_epoch_raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub this_epoch_quality_adj_power: StoragePower,
    pub this_epoch_pledge_collateral: TokenAmount,
    pub this_epoch_qa_power_smoothed: FilterEstimate,
    pub miner_count: i64,
    pub miner_above_min_power_count: i64,
    pub cron_event_queue: Cid,
    pub first_cron_epoch: ChainEpoch,
    pub claims: Cid,
    pub proof_validation_batch: Option<Cid>,
}

impl From<StateV0> for State {
    fn from(s: StateV0) -> Self {
        Self {
            total_raw_byte_power: s.total_raw_byte_power,
            total_bytes_committed: s.total_bytes_committed,
            total_quality_adj_power: s.total_quality_adj_power,
            total_qa_bytes_committed: s.total_qa_bytes_committed,
            total_pledge_collateral: s.total_pledge_collateral,
            this_epoch_qa_power_smoothed: s.this_epoch_qa_power_smoothed.unwrap_or_default(),
            miner_count: s.miner_count,
            miner_above_min_power_count: s.miner_above_min_power_count,
            claims: s.claims,
        }
    }
}

impl From<StateV2> for State {
    fn from(s: StateV2) -> Self {
        Self {
            total_raw_byte_power: s.total_raw_byte_power,
            total_bytes_committed: s.total_bytes_committed,
            total_quality_adj_power: s.total_quality_adj_power,
            total_qa_bytes_committed: s.total_qa_bytes_committed,
            total_pledge_collateral: s.total_pledge_collateral,
            this_epoch_qa_power_smoothed: s.this_epoch_qa_power_smoothed,
            miner_count: s.miner_count,
            miner_above_min_power_count: s.miner_above_min_power_count,
            claims: s.claims,
        }
    }
}

macro_rules! upstream_state {
    ($($state:ty),+) => {
        $(
            impl From<$state> for State {
                fn from(s: $state) -> Self {
                    Self {
                        total_raw_byte_power: s.total_raw_byte_power,
                        total_bytes_committed: s.total_bytes_committed,
                        total_quality_adj_power: s.total_quality_adj_power,
                        total_qa_bytes_committed: s.total_qa_bytes_committed,
                        total_pledge_collateral: econ::from_v2(&s.total_pledge_collateral),
                        this_epoch_qa_power_smoothed: FilterEstimate {
                            position: s.this_epoch_qa_power_smoothed.position,
                            velocity: s.this_epoch_qa_power_smoothed.velocity,
                        },
                        miner_count: s.miner_count,
                        miner_above_min_power_count: s.miner_above_min_power_count,
                        claims: s.claims,
                    }
                }
            }
        )+
    };
}

upstream_state!(v8::State, v9::State);

impl State {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("power state", version, bytes,
            upstream { V8 => v8::State, V9 => v9::State },
            local {
                16 => StateV0,
                15 => StateV2,
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
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Claim {
    pub window_post_proof_type: Option<RegisteredProof>,
    pub raw_byte_power: StoragePower,
    pub quality_adj_power: StoragePower,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ClaimV0 {
    #[serde(with = "bigint_ser")]
    pub raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub quality_adj_power: StoragePower,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ClaimV2 {
    pub window_post_proof_type: RegisteredProof,
    #[serde(with = "bigint_ser")]
    pub raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub quality_adj_power: StoragePower,
}

impl From<ClaimV0> for Claim {
    fn from(c: ClaimV0) -> Self {
        Self {
            window_post_proof_type: None,
            raw_byte_power: c.raw_byte_power,
            quality_adj_power: c.quality_adj_power,
        }
    }
}

impl From<ClaimV2> for Claim {
    fn from(c: ClaimV2) -> Self {
        Self {
            window_post_proof_type: Some(c.window_post_proof_type),
            raw_byte_power: c.raw_byte_power,
            quality_adj_power: c.quality_adj_power,
        }
    }
}

macro_rules! upstream_claim {
    ($($claim:ty),+) => {
        $(
            impl From<$claim> for Claim {
                fn from(c: $claim) -> Self {
                    Self {
                        window_post_proof_type: Some(i64::from(c.window_post_proof_type)),
                        raw_byte_power: c.raw_byte_power,
                        quality_adj_power: c.quality_adj_power,
                    }
                }
            }
        )+
    };
}

upstream_claim!(v8::Claim, v9::Claim);

impl Claim {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("power claim", version, bytes,
            upstream { V8 => v8::Claim, V9 => v9::Claim },
            local {
                2 => ClaimV0,
                3 => ClaimV2,
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_of_both_layouts() {
        let v0 = ClaimV0 {
            raw_byte_power: BigInt::from(10),
            quality_adj_power: BigInt::from(20),
        };
        let v2 = ClaimV2 {
            window_post_proof_type: 9,
            raw_byte_power: BigInt::from(10),
            quality_adj_power: BigInt::from(20),
        };
        let a = fvm_ipld_encoding::to_vec(&v0).unwrap();
        let a = Claim::decode(&a, ActorVersion::V0).unwrap();
        let b = fvm_ipld_encoding::to_vec(&v2).unwrap();
        let b = Claim::decode(&b, ActorVersion::V2).unwrap();
        assert_eq!(a.quality_adj_power, b.quality_adj_power);
        assert_eq!(a.window_post_proof_type, None);
        assert_eq!(b.window_post_proof_type, Some(9));
    }

    #[test]
    fn later_claims_decode_through_the_actor_crate() {
        let v9 = v9::Claim {
            window_post_proof_type: fvm_shared2::sector::RegisteredPoStProof::from(9),
            raw_byte_power: BigInt::from(10),
            quality_adj_power: BigInt::from(20),
        };
        let bytes = fvm_ipld_encoding::to_vec(&v9).unwrap();
        let claim = Claim::decode(&bytes, ActorVersion::V9).unwrap();
        assert_eq!(claim.window_post_proof_type, Some(9));
        assert_eq!(claim.quality_adj_power, BigInt::from(20));
        // v2 through v9 share one encoding.
        assert_eq!(Claim::decode(&bytes, ActorVersion::V7).unwrap(), claim);
        assert!(Claim::decode(&bytes, ActorVersion::V8).is_ok());
    }

    #[test]
    fn v8_state_matches_the_v2_layout() {
        let v2 = StateV2 {
            total_raw_byte_power: BigInt::from(1),
            total_bytes_committed: BigInt::from(2),
            total_quality_adj_power: BigInt::from(3),
            total_qa_bytes_committed: BigInt::from(4),
            total_pledge_collateral: TokenAmount::from_atto(5),
            this_epoch_raw_byte_power: BigInt::from(6),
            this_epoch_quality_adj_power: BigInt::from(7),
            this_epoch_pledge_collateral: TokenAmount::from_atto(8),
            this_epoch_qa_power_smoothed: FilterEstimate {
                position: BigInt::from(9),
                velocity: BigInt::from(10),
            },
            miner_count: 11,
            miner_above_min_power_count: 12,
            cron_event_queue: crate::utils::encoding::raw_cid(b"queue"),
            first_cron_epoch: 13,
            claims: crate::utils::encoding::raw_cid(b"claims"),
            proof_validation_batch: None,
        };
        let bytes = fvm_ipld_encoding::to_vec(&v2).unwrap();
        let local = State::decode(&bytes, ActorVersion::V7).unwrap();
        let upstream = State::decode(&bytes, ActorVersion::V8).unwrap();
        assert_eq!(upstream, local);
        assert_eq!(upstream.total_pledge_collateral, TokenAmount::from_atto(5));
        assert_eq!(upstream.this_epoch_qa_power_smoothed.velocity, BigInt::from(10));
    }
}
