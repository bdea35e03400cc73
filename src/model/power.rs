// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerActorClaim {
    pub height: ChainEpoch,
    pub miner_id: String,
    pub state_root: String,
    pub raw_byte_power: String,
    pub quality_adj_power: String,
}

impl_model! {
    PowerActorClaim => PowerActorClaims,
}
