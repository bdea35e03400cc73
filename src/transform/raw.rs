// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use ipld_core::ipld::Ipld;

use super::RowKey;
use crate::extract::RawActorChange;
use crate::model::{Actor, ActorState, Rows};
use crate::shim::address::Address;
use crate::utils::encoding::ipld_to_json;

pub(super) fn transform(key: &RowKey, changes: &BTreeMap<Address, RawActorChange>) -> Rows {
    let mut rows = Rows::default();
    for (address, change) in changes {
        rows.push(Actor {
            height: key.height,
            id: address.to_string(),
            state_root: key.state_root.clone(),
            code: change.code.to_string(),
            head: change.head.to_string(),
            balance: change.balance.atto().to_string(),
            nonce: change.nonce,
        });
        let Some(state) = &change.state else {
            continue;
        };
        rows.push_result(
            format!("actor {address} state"),
            state.decode::<Ipld>().map(|ipld| ActorState {
                height: key.height,
                head: change.head.to_string(),
                code: change.code.to_string(),
                state: ipld_to_json(&ipld),
            }),
        );
    }
    rows
}
