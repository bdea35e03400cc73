// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Serialize;
use strum::Display;

use super::impl_model;
use crate::diff::ChangeKind;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryEvent {
    Added,
    Removed,
    Modified,
}

impl RegistryEvent {
    pub fn of(kind: ChangeKind) -> Option<Self> {
        match kind {
            ChangeKind::Add => Some(Self::Added),
            ChangeKind::Remove => Some(Self::Removed),
            ChangeKind::Modify => Some(Self::Modified),
            ChangeKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedRegistryVerifier {
    pub height: ChainEpoch,
    pub state_root: String,
    pub address: String,
    pub data_cap: String,
    pub event: RegistryEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedRegistryVerifiedClient {
    pub height: ChainEpoch,
    pub state_root: String,
    pub address: String,
    pub data_cap: String,
    pub event: RegistryEvent,
}

impl_model! {
    VerifiedRegistryVerifier => VerifiedRegistryVerifiers,
    VerifiedRegistryVerifiedClient => VerifiedRegistryVerifiedClients,
}
