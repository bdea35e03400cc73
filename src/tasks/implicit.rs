// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;

use super::messages::UNKNOWN_ACTOR;
use crate::blocks::Tipset;
use crate::model::{InternalMessage, Rows, VmMessage};
use crate::shim::actors::ActorCodeRegistry;
use crate::source::{DataSource, ExecutionTrace};

fn name_and_family(codes: &ActorCodeRegistry, code: Option<&Cid>) -> (String, String) {
    code.and_then(|c| codes.lookup(c))
        .map(|b| (b.name(), b.family.to_string()))
        .unwrap_or_else(|| (UNKNOWN_ACTOR.to_string(), UNKNOWN_ACTOR.to_string()))
}

fn hex_or_none(bytes: &[u8]) -> Option<String> {
    (!bytes.is_empty()).then(|| hex::encode(bytes))
}

/// Implicit messages issued by system actors during the execution of
/// `executed`, and every nested call made while executing any message.
pub(super) async fn extract<S: DataSource>(
    source: &S,
    current: &Tipset,
    executed: &Tipset,
) -> anyhow::Result<Rows> {
    let executions = source
        .message_executions(current, executed)
        .await
        .context("failed to get message executions")?;
    let height = executed.epoch();
    let state_root = current.parent_state().to_string();
    let codes = source.actor_codes();
    let mut rows = Rows::default();
    for exec in &executions {
        let source_cid = exec.cid.to_string();
        if exec.implicit {
            let t = &exec.trace;
            let (actor_name, actor_family) = name_and_family(codes, t.code.as_ref());
            rows.push(InternalMessage {
                height,
                cid: source_cid.clone(),
                state_root: state_root.clone(),
                source_message: None,
                from: t.from.to_string(),
                to: t.to.to_string(),
                value: t.value.atto().to_string(),
                method: t.method,
                actor_name,
                actor_family,
                exit_code: t.receipt.exit_code,
                gas_used: t.receipt.gas_used,
            });
        }
        let mut stack: Vec<(&ExecutionTrace, u64)> =
            exec.trace.subcalls.iter().rev().map(|c| (c, 1)).collect();
        while let Some((call, depth)) = stack.pop() {
            stack.extend(call.subcalls.iter().rev().map(|c| (c, depth + 1)));
            let cid = match call.message_cid() {
                Ok(cid) => cid,
                Err(e) => {
                    rows.error(format!("call of {source_cid} at depth {depth}: {e:#}"));
                    continue;
                }
            };
            rows.push(VmMessage {
                height,
                state_root: state_root.clone(),
                cid: cid.to_string(),
                source: source_cid.clone(),
                from: call.from.to_string(),
                to: call.to.to_string(),
                value: call.value.atto().to_string(),
                method: call.method,
                actor_code: name_and_family(codes, call.code.as_ref()).0,
                exit_code: call.receipt.exit_code,
                gas_used: call.receipt.gas_used,
                params: hex_or_none(call.params.bytes()),
                returns: hex_or_none(call.receipt.return_data.bytes()),
                index: depth,
            });
        }
    }
    Ok(rows)
}
