// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::RowKey;
use crate::container::VerifregDiff;
use crate::diff::MapChange;
use crate::model::{
    RegistryEvent, Rows, VerifiedRegistryVerifiedClient, VerifiedRegistryVerifier,
};
use crate::shim::address::Address;
use crate::shim::bigint::bigint_ser::BigIntDe;

struct Entry {
    address: String,
    data_cap: String,
    event: RegistryEvent,
}

pub(super) fn transform(key: &RowKey, diff: &VerifregDiff) -> Rows {
    let mut rows = Rows::default();
    for change in &diff.verifiers {
        rows.push_result(
            format!("verifier {}", hex::encode(&change.key)),
            entry(change).map(|e| VerifiedRegistryVerifier {
                height: key.height,
                state_root: key.state_root.clone(),
                address: e.address,
                data_cap: e.data_cap,
                event: e.event,
            }),
        );
    }
    for change in &diff.clients {
        rows.push_result(
            format!("verified client {}", hex::encode(&change.key)),
            entry(change).map(|e| VerifiedRegistryVerifiedClient {
                height: key.height,
                state_root: key.state_root.clone(),
                address: e.address,
                data_cap: e.data_cap,
                event: e.event,
            }),
        );
    }
    rows
}

/// A removed entry reports the data cap it had before removal.
fn entry(change: &MapChange) -> anyhow::Result<Entry> {
    let event = RegistryEvent::of(change.kind)
        .ok_or_else(|| anyhow::anyhow!("unexpected change kind {}", change.kind))?;
    let value = change
        .current
        .as_ref()
        .or(change.previous.as_ref())
        .ok_or_else(|| anyhow::anyhow!("change without a value"))?;
    let BigIntDe(data_cap) = value.decode()?;
    Ok(Entry {
        address: Address::from_bytes(&change.key)?.to_string(),
        data_cap: data_cap.to_string(),
        event,
    })
}
