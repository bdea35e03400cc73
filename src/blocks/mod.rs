// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

mod header;
mod tipset;

pub use header::{BeaconEntry, BlockHeader, ElectionProof, Ticket};
pub use tipset::{Tipset, TipsetKey};

/// Blockchain blocks error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The given tipset has no blocks
    #[error("No blocks for tipset")]
    NoBlocks,
    /// Tipset contains invalid data, as described by the string parameter.
    #[error("Invalid tipset: {0}")]
    InvalidTipset(String),
}
