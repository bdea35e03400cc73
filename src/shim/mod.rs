// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod actors;
pub mod version;

pub mod address {
    pub use fvm_shared4::address::{Address, Payload, Protocol};

    /// Re-reads an address decoded by the v8 and v9 actor crates.
    pub fn from_v2(addr: &fvm_shared2::address::Address) -> anyhow::Result<Address> {
        Ok(Address::from_bytes(&addr.to_bytes())?)
    }
}

pub mod bigint {
    pub use fvm_shared4::bigint::{BigInt, bigint_ser};
}

pub mod clock {
    pub use fvm_shared4::clock::{ChainEpoch, EPOCH_UNDEFINED};
}

pub mod econ {
    pub use fvm_shared4::econ::TokenAmount;

    pub fn from_v2(amount: &fvm_shared2::econ::TokenAmount) -> TokenAmount {
        TokenAmount::from_atto(amount.atto().clone())
    }
}

pub mod message {
    pub use fvm_shared4::message::Message;
}

pub mod sector {
    /// Sector numbers are assigned by miners and unique per miner.
    pub type SectorNumber = u64;
    /// Registered proof types are kept as their on-chain integer form.
    pub type RegisteredProof = i64;
    pub type StoragePower = fvm_shared4::bigint::BigInt;
    pub type DealWeight = fvm_shared4::bigint::BigInt;
    pub type DealId = u64;
}
