// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Filecoin gas accounting of an executed message.

use num_traits::Zero as _;

use crate::shim::bigint::BigInt;
use crate::shim::econ::TokenAmount;

/// Gas a block may use before the base fee rises.
pub const BLOCK_GAS_TARGET: u64 = 5_000_000_000;

/// Numerator and denominator of the gas overuse allowance.
const GAS_OVERUSE_NUM: u64 = 11;
const GAS_OVERUSE_DENOM: u64 = 10;

/// Where the funds charged for a message ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasOutputs {
    pub base_fee_burn: TokenAmount,
    pub over_estimation_burn: TokenAmount,
    pub miner_penalty: TokenAmount,
    pub miner_tip: TokenAmount,
    pub refund: TokenAmount,
    pub gas_refund: u64,
    pub gas_burned: u64,
}

/// Splits the unused part of `gas_limit` into refunded and burned gas.
/// Up to 10% over-estimation is free; beyond that, burning grows with the
/// over-estimation and is capped at the gas actually used.
pub fn gas_burned(gas_used: u64, gas_limit: u64) -> (u64, u64) {
    if gas_used == 0 {
        return (0, gas_limit);
    }
    let used = i128::from(gas_used);
    let limit = i128::from(gas_limit);
    let mut over = limit - (i128::from(GAS_OVERUSE_NUM) * used) / i128::from(GAS_OVERUSE_DENOM);
    if over < 0 {
        return (gas_limit.saturating_sub(gas_used), 0);
    }
    if over > used {
        over = used;
    }
    let burned = (limit - used) * over / used;
    let refund = limit - used - burned;
    (
        u64::try_from(refund).unwrap_or_default(),
        u64::try_from(burned).unwrap_or_default(),
    )
}

pub fn compute_gas_outputs(
    gas_used: u64,
    gas_limit: u64,
    base_fee: &TokenAmount,
    fee_cap: &TokenAmount,
    premium: &TokenAmount,
    charge_network_fee: bool,
) -> GasOutputs {
    let base_fee = base_fee.atto();
    let fee_cap = fee_cap.atto();
    let used = BigInt::from(gas_used);
    let limit = BigInt::from(gas_limit);

    let base_fee_to_pay = base_fee.min(fee_cap).clone();
    let mut miner_penalty = BigInt::zero();
    if base_fee > fee_cap {
        miner_penalty = (base_fee - fee_cap) * &used;
    }
    let base_fee_burn = if charge_network_fee {
        &base_fee_to_pay * &used
    } else {
        BigInt::zero()
    };
    let tip_per_gas = premium.atto().min(&(fee_cap - &base_fee_to_pay)).clone();
    let miner_tip = tip_per_gas * &limit;

    let (gas_refund, gas_burned) = gas_burned(gas_used, gas_limit);
    let burned = BigInt::from(gas_burned);
    let over_estimation_burn = &base_fee_to_pay * &burned;
    miner_penalty += (base_fee - &base_fee_to_pay) * &burned;
    let refund = fee_cap * &limit - &base_fee_burn - &miner_tip - &over_estimation_burn;

    GasOutputs {
        base_fee_burn: TokenAmount::from_atto(base_fee_burn),
        over_estimation_burn: TokenAmount::from_atto(over_estimation_burn),
        miner_penalty: TokenAmount::from_atto(miner_penalty),
        miner_tip: TokenAmount::from_atto(miner_tip),
        refund: TokenAmount::from_atto(refund),
        gas_refund,
        gas_burned,
    }
}
