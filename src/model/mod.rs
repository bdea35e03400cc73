// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Flat row models, one type per output table. Unless stated otherwise a
//! row is keyed by the height of the current tipset and the state root it
//! was computed from.

mod actors;
mod blocks;
mod chain;
mod market;
mod messages;
mod miner;
mod multisig;
mod power;
mod report;
mod verifreg;

use std::collections::BTreeSet;
use std::fmt;

pub use actors::{Actor, ActorState, IdAddress};
pub use blocks::{BlockHeader, BlockParent, DrandBlockEntry};
pub use chain::{ChainConsensus, ChainEconomics, ChainPower, ChainReward};
pub use market::{MarketDealProposal, MarketDealState};
pub use messages::{
    BlockMessage, DerivedGasOutputs, InternalMessage, Message, MessageGasEconomy, Receipt,
    VmMessage,
};
pub use miner::{
    MinerFeeDebt, MinerInfo, MinerLockedFund, MinerPreCommitInfo, MinerPreCommitInfoV9,
    MinerSectorDeal, MinerSectorEvent, MinerSectorInfo, MinerSectorInfoV7, SectorEvent,
};
pub use multisig::{MultisigApproval, MultisigTransaction};
pub use power::PowerActorClaim;
pub use report::{ProcessingReport, ReportStatus};
pub use verifreg::{RegistryEvent, VerifiedRegistryVerifiedClient, VerifiedRegistryVerifier};

use crate::sink::{BatchWriter, Persistable};
use crate::tasks::Table;

macro_rules! impl_model {
    ($($row:ty => $table:ident),+ $(,)?) => {
        $(
            impl $crate::sink::Model for $row {
                const TABLE: $crate::tasks::Table = $crate::tasks::Table::$table;
            }
        )+
    };
}
pub(crate) use impl_model;

/// Rows produced by one task for one tipset, with the errors met while
/// producing them.
#[derive(Default)]
pub struct Rows {
    rows: Vec<Box<dyn Persistable>>,
    errors: Vec<String>,
}

impl Rows {
    pub fn push(&mut self, row: impl Persistable + 'static) {
        self.rows.push(Box::new(row));
    }

    pub fn extend<P: Persistable + 'static>(&mut self, rows: impl IntoIterator<Item = P>) {
        self.rows
            .extend(rows.into_iter().map(|r| Box::new(r) as Box<dyn Persistable>));
    }

    /// Keeps a row, or records why it could not be built.
    pub fn push_result<P: Persistable + 'static>(
        &mut self,
        what: impl fmt::Display,
        row: anyhow::Result<P>,
    ) {
        match row {
            Ok(row) => self.push(row),
            Err(e) => self.error(format!("{what}: {e:#}")),
        }
    }

    pub fn error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn append(&mut self, other: Rows) {
        self.rows.extend(other.rows);
        self.errors.extend(other.errors);
    }

    /// Drops rows of tables that are not enabled.
    pub fn retain_tables(&mut self, tables: &BTreeSet<Table>) {
        self.rows.retain(|r| tables.contains(&r.table()));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self, table: Table) -> usize {
        self.rows.iter().filter(|r| r.table() == table).count()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn as_refs(&self) -> Vec<&dyn Persistable> {
        self.rows.iter().map(|r| r.as_ref()).collect()
    }

    pub fn write_to(&self, writer: &mut BatchWriter) -> anyhow::Result<()> {
        self.rows.iter().try_for_each(|r| r.persist(writer))
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("rows", &self.rows.len())
            .field("errors", &self.errors)
            .finish()
    }
}
