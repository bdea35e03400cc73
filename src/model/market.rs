// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketDealProposal {
    pub height: ChainEpoch,
    pub deal_id: u64,
    pub state_root: String,
    pub piece_cid: String,
    pub padded_piece_size: u64,
    pub unpadded_piece_size: u64,
    pub is_verified: bool,
    pub client_id: String,
    pub provider_id: String,
    pub start_epoch: ChainEpoch,
    pub end_epoch: ChainEpoch,
    pub storage_price_per_epoch: String,
    pub provider_collateral: String,
    pub client_collateral: String,
    /// Sanitized label; base64 encoded from actor version 8 onwards.
    pub label: String,
    /// Whether the label was a string, known from actor version 8 onwards.
    pub is_string: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketDealState {
    pub height: ChainEpoch,
    pub deal_id: u64,
    pub state_root: String,
    pub sector_start_epoch: ChainEpoch,
    pub last_update_epoch: ChainEpoch,
    pub slash_epoch: ChainEpoch,
}

impl_model! {
    MarketDealProposal => MarketDealProposals,
    MarketDealState => MarketDealStates,
}
