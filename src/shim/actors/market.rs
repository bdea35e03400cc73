// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use cid::Cid;
use fil_actor_market_state::{v8, v9};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::decode_versioned;
use crate::shim::{
    address::{self, Address},
    clock::ChainEpoch,
    econ::{self, TokenAmount},
    version::ActorVersion,
};
use crate::utils::db::BlockstoreExt as _;

/// Version-neutral view of the market actor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Array of deal proposals, keyed by deal id.
    pub proposals: Cid,
    /// Array of deal states, keyed by deal id.
    pub states: Cid,
    pub next_id: u64,
}

/// Market state of v0 to v7.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct StateV0 {
    pub proposals: Cid,
    pub states: Cid,
    pub pending_proposals: Cid,
    pub escrow_table: Cid,
    pub locked_table: Cid,
    pub next_id: u64,
    pub deal_ops_by_epoch: Cid,
    pub last_cron: ChainEpoch,
    pub total_client_locked_collateral: TokenAmount,
    pub total_provider_locked_collateral: TokenAmount,
    pub total_client_storage_fee: TokenAmount,
}

impl From<StateV0> for State {
    fn from(s: StateV0) -> Self {
        Self {
            proposals: s.proposals,
            states: s.states,
            next_id: s.next_id,
        }
    }
}

macro_rules! upstream_state {
    ($($state:ty),+) => {
        $(
            impl From<$state> for State {
                fn from(s: $state) -> Self {
                    Self {
                        proposals: s.proposals,
                        states: s.states,
                        next_id: s.next_id,
                    }
                }
            }
        )+
    };
}

upstream_state!(v8::State, v9::State);

impl State {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("market state", version, bytes,
            upstream { V8 => v8::State, V9 => v9::State },
            local { 11 => StateV0 }
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

/// Deal label. Earlier generations always carried text; later ones accept
/// arbitrary bytes as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealLabel {
    String(String),
    Bytes(Vec<u8>),
}

impl DealLabel {
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::String(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

impl Default for DealLabel {
    fn default() -> Self {
        Self::String(String::new())
    }
}

impl Serialize for DealLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
        }
    }
}

impl<'de> Deserialize<'de> for DealLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelVisitor;

        impl de::Visitor<'_> for LabelVisitor {
            type Value = DealLabel;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(DealLabel::String(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(DealLabel::String(v))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(DealLabel::Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(DealLabel::Bytes(v))
            }
        }

        deserializer.deserialize_any(LabelVisitor)
    }
}

/// Deal proposal. The v0 to v7 encoding is declared here; v8 and v9
/// proposals are converted from the actor crates.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct DealProposal {
    pub piece_cid: Cid,
    pub piece_size: u64,
    pub verified_deal: bool,
    pub client: Address,
    pub provider: Address,
    pub label: DealLabel,
    pub start_epoch: ChainEpoch,
    pub end_epoch: ChainEpoch,
    pub storage_price_per_epoch: TokenAmount,
    pub provider_collateral: TokenAmount,
    pub client_collateral: TokenAmount,
}

macro_rules! upstream_proposal {
    ($($v:ident),+) => {
        $(
            impl TryFrom<$v::DealProposal> for DealProposal {
                type Error = anyhow::Error;

                fn try_from(p: $v::DealProposal) -> anyhow::Result<Self> {
                    Ok(Self {
                        piece_cid: p.piece_cid,
                        piece_size: p.piece_size.0,
                        verified_deal: p.verified_deal,
                        client: address::from_v2(&p.client)?,
                        provider: address::from_v2(&p.provider)?,
                        label: match p.label {
                            $v::Label::String(s) => DealLabel::String(s),
                            $v::Label::Bytes(b) => DealLabel::Bytes(b),
                        },
                        start_epoch: p.start_epoch,
                        end_epoch: p.end_epoch,
                        storage_price_per_epoch: econ::from_v2(&p.storage_price_per_epoch),
                        provider_collateral: econ::from_v2(&p.provider_collateral),
                        client_collateral: econ::from_v2(&p.client_collateral),
                    })
                }
            }
        )+
    };
}

upstream_proposal!(v8, v9);

impl DealProposal {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        match version {
            ActorVersion::V8 => {
                fvm_ipld_encoding::from_slice::<v8::DealProposal>(bytes)?.try_into()
            }
            ActorVersion::V9 => {
                fvm_ipld_encoding::from_slice::<v9::DealProposal>(bytes)?.try_into()
            }
            _ => Ok(fvm_ipld_encoding::from_slice(bytes)?),
        }
    }

    /// Unpadded size of the piece: padding adds one bit every 127.
    pub fn unpadded_piece_size(&self) -> u64 {
        self.piece_size - self.piece_size / 128
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealState {
    pub sector_start_epoch: ChainEpoch,
    pub last_updated_epoch: ChainEpoch,
    pub slash_epoch: ChainEpoch,
    /// Verified registry allocation of the deal, zero before v9 or when none.
    pub verified_claim: u64,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealStateV0 {
    pub sector_start_epoch: ChainEpoch,
    pub last_updated_epoch: ChainEpoch,
    pub slash_epoch: ChainEpoch,
}

impl From<DealStateV0> for DealState {
    fn from(s: DealStateV0) -> Self {
        Self {
            sector_start_epoch: s.sector_start_epoch,
            last_updated_epoch: s.last_updated_epoch,
            slash_epoch: s.slash_epoch,
            verified_claim: 0,
        }
    }
}

impl From<v8::DealState> for DealState {
    fn from(s: v8::DealState) -> Self {
        Self {
            sector_start_epoch: s.sector_start_epoch,
            last_updated_epoch: s.last_updated_epoch,
            slash_epoch: s.slash_epoch,
            verified_claim: 0,
        }
    }
}

impl From<v9::DealState> for DealState {
    fn from(s: v9::DealState) -> Self {
        Self {
            sector_start_epoch: s.sector_start_epoch,
            last_updated_epoch: s.last_updated_epoch,
            slash_epoch: s.slash_epoch,
            verified_claim: s.verified_claim,
        }
    }
}

impl DealState {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("deal state", version, bytes,
            upstream { V8 => v8::DealState, V9 => v9::DealState },
            local { 3 => DealStateV0 }
        )
    }
}
