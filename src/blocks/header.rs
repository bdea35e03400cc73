// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::OnceLock;

use super::TipsetKey;
use crate::shim::{address::Address, bigint::BigInt, clock::ChainEpoch, econ::TokenAmount};
use crate::utils::encoding::{blake2b_256, cid_from_cbor};
use cid::Cid;
use fvm_ipld_encoding::strict_bytes;
use fvm_ipld_encoding::tuple::*;
use serde::{Deserialize, Serialize};

/// A Ticket is a marker of a tick of the blockchain's clock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize_tuple, Deserialize_tuple)]
pub struct Ticket {
    #[serde(with = "strict_bytes")]
    pub vrfproof: Vec<u8>,
}

/// Proof of a miner's right to mine in a given epoch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize_tuple, Deserialize_tuple)]
pub struct ElectionProof {
    pub win_count: i64,
    #[serde(with = "strict_bytes")]
    pub vrfproof: Vec<u8>,
}

/// Randomness beacon round included in a block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize_tuple, Deserialize_tuple)]
pub struct BeaconEntry {
    pub round: u64,
    #[serde(with = "strict_bytes")]
    pub data: Vec<u8>,
}

#[derive(Deserialize_tuple, Serialize_tuple, Clone, Debug, PartialEq, Eq)]
struct RawBlockHeader {
    miner_address: Address,
    ticket: Option<Ticket>,
    election_proof: Option<ElectionProof>,
    beacon_entries: Vec<BeaconEntry>,
    parents: TipsetKey,
    #[serde(with = "fvm_shared4::bigint::bigint_ser")]
    weight: BigInt,
    epoch: ChainEpoch,
    state_root: Cid,
    message_receipts: Cid,
    messages: Cid,
    timestamp: u64,
    fork_signal: u64,
    parent_base_fee: TokenAmount,
}

/// Header of a block as delivered by the node. The content identifier is
/// computed once from the canonical encoding and cached.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    /// The address of the miner actor that mined this block
    pub miner_address: Address,
    pub ticket: Option<Ticket>,
    pub election_proof: Option<ElectionProof>,
    /// The verifiable oracle randomness used to elect this block's author leader
    pub beacon_entries: Vec<BeaconEntry>,
    /// The set of parents this block was based on.
    pub parents: TipsetKey,
    /// The aggregate chain weight of the parent set
    pub weight: BigInt,
    pub epoch: ChainEpoch,
    /// The CID of the parent state root after calculating parent tipset.
    pub state_root: Cid,
    /// The CID of the root of an array of `MessageReceipts`
    pub message_receipts: Cid,
    /// The CID of the Merkle links for `bls_messages` and `secp_messages`
    pub messages: Cid,
    /// Block creation time, in seconds since the Unix epoch
    pub timestamp: u64,
    pub fork_signal: u64,
    /// The base fee of the parent block
    pub parent_base_fee: TokenAmount,
    pub(super) cid: OnceLock<Cid>,
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.cid() == other.cid()
    }
}

impl Eq for BlockHeader {}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            miner_address: Address::new_id(0),
            ticket: None,
            election_proof: None,
            beacon_entries: Vec::new(),
            parents: TipsetKey::default(),
            weight: BigInt::default(),
            epoch: 0,
            state_root: Cid::default(),
            message_receipts: Cid::default(),
            messages: Cid::default(),
            timestamp: 0,
            fork_signal: 0,
            parent_base_fee: TokenAmount::default(),
            cid: OnceLock::new(),
        }
    }
}

impl BlockHeader {
    fn to_raw(&self) -> RawBlockHeader {
        RawBlockHeader {
            miner_address: self.miner_address,
            ticket: self.ticket.clone(),
            election_proof: self.election_proof.clone(),
            beacon_entries: self.beacon_entries.clone(),
            parents: self.parents.clone(),
            weight: self.weight.clone(),
            epoch: self.epoch,
            state_root: self.state_root,
            message_receipts: self.message_receipts,
            messages: self.messages,
            timestamp: self.timestamp,
            fork_signal: self.fork_signal,
            parent_base_fee: self.parent_base_fee.clone(),
        }
    }

    /// Content identifier of the header.
    pub fn cid(&self) -> &Cid {
        self.cid.get_or_init(|| {
            // Encoding a plain tuple struct into a Vec cannot fail.
            cid_from_cbor(&self.to_raw()).unwrap_or_default()
        })
    }

    /// Number of election wins claimed by this block, zero without a proof.
    pub fn win_count(&self) -> i64 {
        self.election_proof
            .as_ref()
            .map(|proof| proof.win_count)
            .unwrap_or_default()
    }

    /// Canonical ordering key within a tipset: the ticket digest, then the CID bytes.
    pub(super) fn tipset_sort_key(&self) -> ([u8; 32], Vec<u8>) {
        let ticket_hash = self
            .ticket
            .as_ref()
            .map(|t| blake2b_256(&t.vrfproof))
            .unwrap_or_default();
        (ticket_hash, self.cid().to_bytes())
    }
}

impl Serialize for BlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawBlockHeader::deserialize(deserializer)?;
        Ok(Self {
            miner_address: raw.miner_address,
            ticket: raw.ticket,
            election_proof: raw.election_proof,
            beacon_entries: raw.beacon_entries,
            parents: raw.parents,
            weight: raw.weight,
            epoch: raw.epoch,
            state_root: raw.state_root,
            message_receipts: raw.message_receipts,
            messages: raw.messages,
            timestamp: raw.timestamp,
            fork_signal: raw.fork_signal,
            parent_base_fee: raw.parent_base_fee,
            cid: OnceLock::new(),
        })
    }
}
