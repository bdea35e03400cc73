// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Version-neutral views over the built-in actor states indexed by this
//! crate. Each family module normalizes every generation into one struct.
//! Actors v8 and v9 are decoded through the upstream `fil_actor_*_state`
//! types; earlier generations, which those crates do not carry, through
//! local tuple layouts told apart by their arity.

pub mod init;
pub mod market;
pub mod miner;
pub mod multisig;
pub mod power;
mod registry;
pub mod reward;
pub mod verifreg;

pub use registry::{ActorCodeRegistry, ActorFamily, BuiltinActor};

use crate::shim::address::Address;

pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(0);
pub const INIT_ACTOR_ADDR: Address = Address::new_id(1);
pub const REWARD_ACTOR_ADDR: Address = Address::new_id(2);
pub const CRON_ACTOR_ADDR: Address = Address::new_id(3);
pub const STORAGE_POWER_ACTOR_ADDR: Address = Address::new_id(4);
pub const STORAGE_MARKET_ACTOR_ADDR: Address = Address::new_id(5);
pub const VERIFIED_REGISTRY_ACTOR_ADDR: Address = Address::new_id(6);
pub const BURNT_FUNDS_ACTOR_ADDR: Address = Address::new_id(99);

/// Error returned when a payload matches none of the known layouts.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} layout with {arity} fields")]
pub struct UnknownLayout {
    pub kind: &'static str,
    pub arity: u64,
}

/// Decodes `bytes` into one of several tuple layouts chosen by arity.
macro_rules! decode_by_arity {
    ($kind:literal, $bytes:expr, { $($arity:literal => $layout:ty),+ $(,)? }) => {{
        let bytes: &[u8] = $bytes;
        match $crate::utils::encoding::cbor_array_len(bytes)? {
            $(
                $arity => Ok(fvm_ipld_encoding::from_slice::<$layout>(bytes)?.into()),
            )+
            arity => Err($crate::shim::actors::UnknownLayout { kind: $kind, arity }.into()),
        }
    }};
}
pub(crate) use decode_by_arity;

/// Decodes `bytes` with the upstream type listed for `version`, or by arity
/// over the local layouts for any other version.
macro_rules! decode_versioned {
    (
        $kind:literal, $version:expr, $bytes:expr,
        upstream { $($v:ident => $upstream:ty),+ $(,)? },
        local { $($arity:literal => $layout:ty),+ $(,)? }
    ) => {{
        let bytes: &[u8] = $bytes;
        match $version {
            $(
                $crate::shim::version::ActorVersion::$v => {
                    let decoded = fvm_ipld_encoding::from_slice::<$upstream>(bytes)?;
                    Ok(decoded.try_into()?)
                }
            )+
            _ => $crate::shim::actors::decode_by_arity!($kind, bytes, {
                $($arity => $layout),+
            }),
        }
    }};
}
pub(crate) use decode_versioned;
