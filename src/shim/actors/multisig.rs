// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::{RawBytes, strict_bytes};

use crate::shim::{address::Address, clock::ChainEpoch, econ::TokenAmount};
use crate::utils::db::BlockstoreExt as _;

pub const METHOD_PROPOSE: u64 = 2;
pub const METHOD_APPROVE: u64 = 3;

/// Multisig wallet state. The layout is shared by every indexed generation.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub signers: Vec<Address>,
    pub num_approvals_threshold: u64,
    pub next_tx_id: i64,
    pub initial_balance: TokenAmount,
    pub start_epoch: ChainEpoch,
    pub unlock_duration: ChainEpoch,
    /// Map of pending transactions, keyed by signed varint transaction id.
    pub pending_txs: Cid,
}

impl State {
    pub fn load<BS: Blockstore>(store: &BS, head: &Cid) -> anyhow::Result<Self> {
        store.get_cbor_required(head)
    }
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub to: Address,
    pub value: TokenAmount,
    pub method: u64,
    pub params: RawBytes,
    pub approved: Vec<Address>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ProposeParams {
    pub to: Address,
    pub value: TokenAmount,
    pub method: u64,
    pub params: RawBytes,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ProposeReturn {
    pub txn_id: i64,
    pub applied: bool,
    pub code: u32,
    pub ret: RawBytes,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct TxnIdParams {
    pub id: i64,
    #[serde(with = "strict_bytes")]
    pub proposal_hash: Vec<u8>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ApproveReturn {
    pub applied: bool,
    pub code: u32,
    pub ret: RawBytes,
}
