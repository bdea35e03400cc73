// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::RowKey;
use crate::diff::{ChangeKind, MapChange};
use crate::model::{IdAddress, Rows};
use crate::shim::address::Address;

/// New and reassigned address mappings. Mappings are never removed on
/// chain; a removal seen here is ignored.
pub(super) fn transform(key: &RowKey, changes: &[MapChange]) -> Rows {
    let mut rows = Rows::default();
    for change in changes {
        let (ChangeKind::Add | ChangeKind::Modify, Some(current)) = (change.kind, &change.current)
        else {
            continue;
        };
        rows.push_result(
            format!("init address {}", hex::encode(&change.key)),
            Address::from_bytes(&change.key)
                .map_err(anyhow::Error::from)
                .and_then(|address| {
                    let id: u64 = current.decode()?;
                    Ok(IdAddress {
                        height: key.height,
                        id: Address::new_id(id).to_string(),
                        address: address.to_string(),
                        state_root: key.state_root.clone(),
                    })
                }),
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Deferred;
    use crate::tasks::Table;
    use crate::transform::test_support::written;

    #[test]
    fn mappings_become_rows() {
        let robust = Address::new_secp256k1(&[1; 65]).unwrap();
        let changes = vec![
            MapChange {
                key: robust.to_bytes(),
                kind: ChangeKind::Add,
                previous: None,
                current: Some(Deferred::encode(&1234u64).unwrap()),
            },
            MapChange {
                key: vec![0xff],
                kind: ChangeKind::Add,
                previous: None,
                current: Some(Deferred::encode(&1u64).unwrap()),
            },
        ];
        let key = RowKey {
            height: 2,
            state_root: "root".into(),
        };
        let rows = transform(&key, &changes);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.errors().len(), 1);
        let writer = written(&rows);
        let row = writer.rows(Table::IdAddresses)[0];
        assert_eq!(row["id"], "f01234");
        assert_eq!(row["address"], robust.to_string());
    }
}
