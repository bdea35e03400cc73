// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

/// Descriptor of an actor whose entry changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub height: ChainEpoch,
    pub id: String,
    pub state_root: String,
    pub code: String,
    pub head: String,
    pub balance: String,
    pub nonce: u64,
}

/// State of an actor rendered as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorState {
    pub height: ChainEpoch,
    pub head: String,
    pub code: String,
    pub state: serde_json::Value,
}

/// Assignment of an id address to a robust address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdAddress {
    pub height: ChainEpoch,
    pub id: String,
    pub address: String,
    pub state_root: String,
}

impl_model! {
    Actor => Actors,
    ActorState => ActorStates,
    IdAddress => IdAddresses,
}
