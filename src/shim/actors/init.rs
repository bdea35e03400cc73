// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use crate::utils::db::BlockstoreExt as _;

/// Init actor state: the robust address to id address mapping.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Map of actor ids, keyed by robust address bytes.
    pub address_map: Cid,
    pub next_id: u64,
    pub network_name: String,
}

impl State {
    pub fn load<BS: Blockstore>(store: &BS, head: &Cid) -> anyhow::Result<Self> {
        store.get_cbor_required(head)
    }
}
