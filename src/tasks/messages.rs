// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::{HashMap, HashSet, HashSetExt as _};
use anyhow::Context as _;
use cid::Cid;
use num_traits::{ToPrimitive as _, Zero as _};

use super::gas::{BLOCK_GAS_TARGET, compute_gas_outputs};
use crate::blocks::Tipset;
use crate::model::{
    BlockMessage, DerivedGasOutputs, Message, MessageGasEconomy, Receipt, Rows,
};
use crate::shim::address::Address;
use crate::shim::econ::TokenAmount;
use crate::source::{ChainMessage, DataSource, StateTree};

const FIL_PRECISION: f64 = 1e18;

/// Placeholder for actors whose code cannot be resolved.
pub(super) const UNKNOWN_ACTOR: &str = "<unknown>";

/// Resolves actor names and families in a state tree, caching per address.
pub(super) struct ActorNames<'a, S: DataSource> {
    source: &'a S,
    tree: StateTree<'a, S::Store>,
    cache: HashMap<Address, (String, String)>,
}

impl<'a, S: DataSource> ActorNames<'a, S> {
    pub fn new(source: &'a S, root: &Cid) -> anyhow::Result<Self> {
        Ok(Self {
            source,
            tree: StateTree::new(source.store().as_ref(), root)?,
            cache: HashMap::default(),
        })
    }

    pub fn name_of(&mut self, address: &Address) -> anyhow::Result<(String, String)> {
        if let Some(hit) = self.cache.get(address) {
            return Ok(hit.clone());
        }
        let resolved = self
            .tree
            .get_actor(address)?
            .and_then(|actor| self.source.actor_codes().lookup(&actor.code))
            .map(|b| (b.name(), b.family.to_string()))
            .unwrap_or_else(|| (UNKNOWN_ACTOR.to_string(), UNKNOWN_ACTOR.to_string()));
        self.cache.insert(*address, resolved.clone());
        Ok(resolved)
    }
}

fn message_row(height: i64, m: &ChainMessage) -> Message {
    Message {
        height,
        cid: m.cid.to_string(),
        from: m.message.from.to_string(),
        to: m.message.to.to_string(),
        value: m.message.value.atto().to_string(),
        gas_fee_cap: m.message.gas_fee_cap.atto().to_string(),
        gas_premium: m.message.gas_premium.atto().to_string(),
        gas_limit: m.message.gas_limit,
        size_bytes: m.size_bytes,
        nonce: m.message.sequence,
        method: m.message.method_num,
    }
}

fn to_fil(amount: &TokenAmount) -> f64 {
    amount.atto().to_f64().unwrap_or_default() / FIL_PRECISION
}

/// Messages included in `executed`, their receipts found in `current` and
/// the gas accounting of both.
pub(super) async fn extract<S: DataSource>(
    source: &S,
    current: &Tipset,
    executed: &Tipset,
) -> anyhow::Result<Rows> {
    let height = executed.epoch();
    let state_root = current.parent_state().to_string();
    let mut rows = Rows::default();

    let blocks = source
        .tipset_block_messages(executed)
        .await
        .context("failed to get block messages")?;
    let mut seen = HashSet::new();
    let mut gas_limit_total = 0u64;
    let mut gas_limit_unique_total = 0u64;
    for block in &blocks {
        for m in &block.messages {
            rows.push(BlockMessage {
                height,
                block: block.block.to_string(),
                message: m.cid.to_string(),
            });
            gas_limit_total += m.message.gas_limit;
            if seen.insert(m.cid) {
                gas_limit_unique_total += m.message.gas_limit;
                rows.push(message_row(height, m));
            }
        }
    }

    let executed_messages = source
        .tipset_message_receipts(current, executed)
        .await
        .context("failed to get message receipts")?;
    let next_base_fee = source
        .compute_base_fee(executed)
        .await
        .context("failed to compute base fee")?;
    let mut names = ActorNames::new(source, current.parent_state())?;
    let base_fee = executed.parent_base_fee();
    for em in &executed_messages {
        let m = &em.message;
        rows.push(Receipt {
            height: current.epoch(),
            message: m.cid.to_string(),
            state_root: state_root.clone(),
            idx: em.index,
            exit_code: em.receipt.exit_code,
            gas_used: em.receipt.gas_used,
        });
        let burn = source.should_burn(executed, m, em.receipt.exit_code)?;
        let outputs = compute_gas_outputs(
            em.receipt.gas_used,
            m.message.gas_limit,
            base_fee,
            &m.message.gas_fee_cap,
            &m.message.gas_premium,
            burn,
        );
        let (actor_name, actor_family) = names.name_of(&m.message.to)?;
        rows.push(DerivedGasOutputs {
            height,
            cid: m.cid.to_string(),
            state_root: state_root.clone(),
            from: m.message.from.to_string(),
            to: m.message.to.to_string(),
            value: m.message.value.atto().to_string(),
            gas_fee_cap: m.message.gas_fee_cap.atto().to_string(),
            gas_premium: m.message.gas_premium.atto().to_string(),
            gas_limit: m.message.gas_limit,
            size_bytes: m.size_bytes,
            nonce: m.message.sequence,
            method: m.message.method_num,
            actor_name,
            actor_family,
            exit_code: em.receipt.exit_code,
            gas_used: em.receipt.gas_used,
            parent_base_fee: base_fee.atto().to_string(),
            base_fee_burn: outputs.base_fee_burn.atto().to_string(),
            over_estimation_burn: outputs.over_estimation_burn.atto().to_string(),
            miner_penalty: outputs.miner_penalty.atto().to_string(),
            miner_tip: outputs.miner_tip.atto().to_string(),
            refund: outputs.refund.atto().to_string(),
            gas_refund: outputs.gas_refund,
            gas_burned: outputs.gas_burned,
        });
    }

    let capacity = (executed.len() as u64 * BLOCK_GAS_TARGET) as f64;
    let base_fee_change_log = if base_fee.atto().is_zero() {
        0.0
    } else {
        (to_fil(&next_base_fee) / to_fil(base_fee)).ln() / 1.125f64.ln()
    };
    rows.push(MessageGasEconomy {
        height,
        state_root: executed.parent_state().to_string(),
        gas_limit_total,
        gas_limit_unique_total,
        base_fee: to_fil(base_fee),
        base_fee_change_log,
        gas_fill_ratio: gas_limit_total as f64 / capacity,
        gas_capacity_ratio: gas_limit_unique_total as f64 / capacity,
        gas_waste_ratio: (gas_limit_total - gas_limit_unique_total) as f64 / capacity,
    });
    Ok(rows)
}
