// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

/// Pending transaction of a multisig wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisigTransaction {
    pub height: ChainEpoch,
    pub multisig_id: String,
    pub state_root: String,
    pub transaction_id: i64,
    pub to: String,
    pub value: String,
    pub method: u64,
    pub params: String,
    pub approved: Vec<String>,
}

/// Approval that executed a multisig transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisigApproval {
    pub height: ChainEpoch,
    pub state_root: String,
    pub multisig_id: String,
    pub message: String,
    pub method: u64,
    pub approver: String,
    pub threshold: u64,
    pub initial_balance: String,
    pub gas_used: u64,
    pub transaction_id: i64,
    pub to: String,
    pub value: String,
    pub signers: Vec<String>,
}

impl_model! {
    MultisigTransaction => MultisigTransactions,
    MultisigApproval => MultisigApprovals,
}
