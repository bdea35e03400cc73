// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Message rows. Messages and their inclusion are keyed by the executed
//! tipset, receipts and execution results by the current one.

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub height: ChainEpoch,
    pub cid: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub gas_fee_cap: String,
    pub gas_premium: String,
    pub gas_limit: u64,
    pub size_bytes: u64,
    pub nonce: u64,
    pub method: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockMessage {
    pub height: ChainEpoch,
    pub block: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub height: ChainEpoch,
    pub message: String,
    pub state_root: String,
    pub idx: u64,
    pub exit_code: u32,
    pub gas_used: u64,
}

/// Gas accounting of an executed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedGasOutputs {
    pub height: ChainEpoch,
    pub cid: String,
    pub state_root: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub gas_fee_cap: String,
    pub gas_premium: String,
    pub gas_limit: u64,
    pub size_bytes: u64,
    pub nonce: u64,
    pub method: u64,
    pub actor_name: String,
    pub actor_family: String,
    pub exit_code: u32,
    pub gas_used: u64,
    pub parent_base_fee: String,
    pub base_fee_burn: String,
    pub over_estimation_burn: String,
    pub miner_penalty: String,
    pub miner_tip: String,
    pub refund: String,
    pub gas_refund: u64,
    pub gas_burned: u64,
}

/// Gas usage of a whole tipset against the block gas target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageGasEconomy {
    pub height: ChainEpoch,
    pub state_root: String,
    pub gas_limit_total: u64,
    pub gas_limit_unique_total: u64,
    pub base_fee: f64,
    pub base_fee_change_log: f64,
    pub gas_fill_ratio: f64,
    pub gas_capacity_ratio: f64,
    pub gas_waste_ratio: f64,
}

/// Message issued implicitly by the system during tipset execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalMessage {
    pub height: ChainEpoch,
    pub cid: String,
    pub state_root: String,
    pub source_message: Option<String>,
    pub from: String,
    pub to: String,
    pub value: String,
    pub method: u64,
    pub actor_name: String,
    pub actor_family: String,
    pub exit_code: u32,
    pub gas_used: u64,
}

/// Call made by an actor while executing a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmMessage {
    pub height: ChainEpoch,
    pub state_root: String,
    pub cid: String,
    pub source: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub method: u64,
    pub actor_code: String,
    pub exit_code: u32,
    pub gas_used: u64,
    pub params: Option<String>,
    pub returns: Option<String>,
    /// Nesting depth below the top level message.
    pub index: u64,
}

impl_model! {
    Message => Messages,
    BlockMessage => BlockMessages,
    Receipt => Receipts,
    DerivedGasOutputs => DerivedGasOutputs,
    MessageGasEconomy => MessageGasEconomy,
    InternalMessage => InternalMessages,
    VmMessage => VmMessages,
}
