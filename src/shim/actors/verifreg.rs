// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fil_actor_verifreg_state::{v8, v9};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::decode_versioned;
use crate::shim::address::{self, Address};
use crate::shim::version::ActorVersion;
use crate::utils::db::BlockstoreExt as _;

/// Version-neutral view of the verified registry. Verified clients moved
/// to the datacap actor in v9, so they are absent from later states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub root_key: Address,
    /// Map of data caps, keyed by verifier address bytes.
    pub verifiers: Cid,
    /// Map of data caps, keyed by client address bytes.
    pub verified_clients: Option<Cid>,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct StateV0 {
    pub root_key: Address,
    pub verifiers: Cid,
    pub verified_clients: Cid,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct StateV7 {
    pub root_key: Address,
    pub verifiers: Cid,
    pub verified_clients: Cid,
    pub remove_data_cap_proposal_ids: Cid,
}

impl From<StateV0> for State {
    fn from(s: StateV0) -> Self {
        Self {
            root_key: s.root_key,
            verifiers: s.verifiers,
            verified_clients: Some(s.verified_clients),
        }
    }
}

impl From<StateV7> for State {
    fn from(s: StateV7) -> Self {
        Self {
            root_key: s.root_key,
            verifiers: s.verifiers,
            verified_clients: Some(s.verified_clients),
        }
    }
}

impl TryFrom<v8::State> for State {
    type Error = anyhow::Error;

    fn try_from(s: v8::State) -> anyhow::Result<Self> {
        Ok(Self {
            root_key: address::from_v2(&s.root_key)?,
            verifiers: s.verifiers,
            verified_clients: Some(s.verified_clients),
        })
    }
}

impl TryFrom<v9::State> for State {
    type Error = anyhow::Error;

    fn try_from(s: v9::State) -> anyhow::Result<Self> {
        Ok(Self {
            root_key: address::from_v2(&s.root_key)?,
            verifiers: s.verifiers,
            verified_clients: None,
        })
    }
}

impl State {
    pub fn decode(bytes: &[u8], version: ActorVersion) -> anyhow::Result<Self> {
        decode_versioned!("verified registry state", version, bytes,
            upstream { V8 => v8::State, V9 => v9::State },
            local {
                3 => StateV0,
                4 => StateV7,
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
