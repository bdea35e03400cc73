// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use integer_encoding::VarInt as _;

use crate::blocks::Tipset;
use crate::diff::{Deferred, HamtShape, hamt_get};
use crate::model::{MultisigApproval, Rows};
use crate::shim::actors::ActorFamily;
use crate::shim::actors::multisig::{
    ApproveReturn, METHOD_APPROVE, METHOD_PROPOSE, ProposeParams, ProposeReturn, State,
    Transaction, TxnIdParams,
};
use crate::shim::address::Address;
use crate::source::{DataSource, ExecutedMessage, StateTree};

/// Outcome of a multisig call that executed its transaction.
struct Applied {
    transaction_id: i64,
    to: Address,
    value: String,
    method: u64,
}

/// Propose and approve messages that caused a multisig transaction to be
/// executed. Rows are keyed by the executed tipset, whose state the
/// approvals were checked against.
pub(super) async fn extract<S: DataSource>(
    source: &S,
    current: &Tipset,
    executed: &Tipset,
) -> anyhow::Result<Rows> {
    let messages = source
        .tipset_message_receipts(current, executed)
        .await
        .context("failed to get message receipts")?;
    let store = source.store().as_ref();
    let tree = StateTree::new(store, executed.parent_state())?;
    let mut rows = Rows::default();
    for em in &messages {
        let method = em.message.message.method_num;
        if em.receipt.exit_code != 0 || (method != METHOD_PROPOSE && method != METHOD_APPROVE) {
            continue;
        }
        let to = em.message.message.to;
        let Some(actor) = tree.get_actor(&to)? else {
            continue;
        };
        let is_multisig = source
            .actor_codes()
            .lookup(&actor.code)
            .is_some_and(|b| b.family == ActorFamily::Multisig);
        if !is_multisig {
            continue;
        }
        let state = State::load(store, &actor.head)?;
        let applied = match applied(store, &state, em) {
            Ok(Some(applied)) => applied,
            Ok(None) => continue,
            Err(e) => {
                rows.error(format!("multisig message {}: {e:#}", em.message.cid));
                continue;
            }
        };
        rows.push(MultisigApproval {
            height: executed.epoch(),
            state_root: executed.parent_state().to_string(),
            multisig_id: tree.lookup_id(&to)?.unwrap_or(to).to_string(),
            message: em.message.cid.to_string(),
            method,
            approver: em.message.message.from.to_string(),
            threshold: state.num_approvals_threshold,
            initial_balance: state.initial_balance.atto().to_string(),
            gas_used: em.receipt.gas_used,
            transaction_id: applied.transaction_id,
            to: applied.to.to_string(),
            value: applied.value,
            signers: state.signers.iter().map(Address::to_string).collect(),
        });
    }
    Ok(rows)
}

fn applied<BS: fvm_ipld_blockstore::Blockstore>(
    store: &BS,
    state: &State,
    em: &ExecutedMessage,
) -> anyhow::Result<Option<Applied>> {
    let params = &em.message.message.params;
    let ret = &em.receipt.return_data;
    if em.message.message.method_num == METHOD_PROPOSE {
        let ret: ProposeReturn = ret.deserialize()?;
        if !ret.applied {
            return Ok(None);
        }
        let params: ProposeParams = params.deserialize()?;
        return Ok(Some(Applied {
            transaction_id: ret.txn_id,
            to: params.to,
            value: params.value.atto().to_string(),
            method: params.method,
        }));
    }
    let ret: ApproveReturn = ret.deserialize()?;
    if !ret.applied {
        return Ok(None);
    }
    let params: TxnIdParams = params.deserialize()?;
    let pending = hamt_get(
        store,
        &state.pending_txs,
        HamtShape::default(),
        &params.id.encode_var_vec(),
    )?
    .with_context(|| format!("pending transaction {} not found", params.id))?;
    let tx: Transaction = Deferred::from_ipld(&pending)?.decode()?;
    Ok(Some(Applied {
        transaction_id: params.id,
        to: tx.to,
        value: tx.value.atto().to_string(),
        method: tx.method,
    }))
}
