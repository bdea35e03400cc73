// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use anyhow::Context as _;
use integer_encoding::VarInt as _;

use super::RowKey;
use crate::diff::{ChangeKind, Deferred, MapChange};
use crate::model::{MultisigTransaction, Rows};
use crate::shim::actors::multisig::Transaction;
use crate::shim::address::Address;

/// Proposed and partially approved transactions. A transaction leaves the
/// pending map when it is applied or cancelled, which the approvals task
/// records instead.
pub(super) fn transform(key: &RowKey, multisigs: &BTreeMap<Address, Vec<MapChange>>) -> Rows {
    let mut rows = Rows::default();
    for (multisig, changes) in multisigs {
        for change in changes {
            let (ChangeKind::Add | ChangeKind::Modify, Some(current)) =
                (change.kind, &change.current)
            else {
                continue;
            };
            rows.push_result(
                format!("multisig {multisig} transaction {}", hex::encode(&change.key)),
                transaction(key, multisig, &change.key, current),
            );
        }
    }
    rows
}

fn transaction(
    key: &RowKey,
    multisig: &Address,
    tx_key: &[u8],
    current: &Deferred,
) -> anyhow::Result<MultisigTransaction> {
    let (transaction_id, _) = i64::decode_var(tx_key).context("invalid transaction key")?;
    let tx: Transaction = current.decode()?;
    Ok(MultisigTransaction {
        height: key.height,
        multisig_id: multisig.to_string(),
        state_root: key.state_root.clone(),
        transaction_id,
        to: tx.to.to_string(),
        value: tx.value.atto().to_string(),
        method: tx.method,
        params: hex::encode(tx.params.bytes()),
        approved: tx.approved.iter().map(Address::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::econ::TokenAmount;
    use crate::tasks::Table;
    use crate::transform::test_support::written;
    use fvm_ipld_encoding::RawBytes;

    #[test]
    fn pending_transactions_become_rows() {
        let tx = Deferred::encode(&Transaction {
            to: Address::new_id(3),
            value: TokenAmount::from_atto(9),
            method: 0,
            params: RawBytes::new(vec![0xab]),
            approved: vec![Address::new_id(10)],
        })
        .unwrap();
        let multisigs = BTreeMap::from([(
            Address::new_id(100),
            vec![
                MapChange {
                    key: (-2i64).encode_var_vec(),
                    kind: ChangeKind::Add,
                    previous: None,
                    current: Some(tx.clone()),
                },
                MapChange {
                    key: 5i64.encode_var_vec(),
                    kind: ChangeKind::Remove,
                    previous: Some(tx),
                    current: None,
                },
            ],
        )]);
        let key = RowKey {
            height: 6,
            state_root: "root".into(),
        };
        let rows = transform(&key, &multisigs);
        assert_eq!(rows.len(), 1);
        let writer = written(&rows);
        let row = writer.rows(Table::MultisigTransactions)[0];
        assert_eq!(row["transaction_id"], -2);
        assert_eq!(row["params"], "ab");
        assert_eq!(row["approved"], serde_json::json!(["f010"]));
        assert_eq!(row["multisig_id"], "f0100");
    }
}
