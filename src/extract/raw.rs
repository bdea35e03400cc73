// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::ActorDiff;
use crate::diff::{ChangeKind, Deferred};
use crate::shim::econ::TokenAmount;
use crate::source::ActorChange;
use crate::utils::db::BlockstoreExt as _;

/// Descriptor and state of a changed actor. Removed actors carry their
/// last descriptor and no state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct RawActorChange {
    pub kind: ChangeKind,
    pub code: Cid,
    pub head: Cid,
    pub nonce: u64,
    pub balance: TokenAmount,
    pub state: Option<Deferred>,
}

pub(super) fn diff<BS: Blockstore>(store: &BS, change: &ActorChange) -> anyhow::Result<ActorDiff> {
    let actor = change.actor();
    let state = change
        .current()
        .map(|current| store.get_required(&current.head).map(Deferred::new))
        .transpose()?;
    Ok(ActorDiff::Raw(RawActorChange {
        kind: change.kind(),
        code: actor.code,
        head: actor.head,
        nonce: actor.nonce,
        balance: actor.balance.clone(),
        state,
    }))
}
