// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Row contract between the indexer and its storage backend.

mod memory;

pub use memory::MemorySink;

use async_trait::async_trait;
use serde::Serialize;

use crate::tasks::Table;

/// Version of the row schemas produced by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// A flat row of one output table.
pub trait Model: Serialize + Send + Sync + 'static {
    const TABLE: Table;
}

/// Anything that can write itself into a batch.
pub trait Persistable: Send + Sync {
    fn table(&self) -> Table;

    fn persist(&self, writer: &mut BatchWriter) -> anyhow::Result<()>;
}

impl<M: Model> Persistable for M {
    fn table(&self) -> Table {
        M::TABLE
    }

    fn persist(&self, writer: &mut BatchWriter) -> anyhow::Result<()> {
        writer.write(self)
    }
}

/// One serialized row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub table: Table,
    pub value: serde_json::Value,
}

/// Accumulates the records of one batch.
#[derive(Debug)]
pub struct BatchWriter {
    schema_version: u32,
    records: Vec<Record>,
}

impl BatchWriter {
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            records: Vec::new(),
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn write<M: Model>(&mut self, row: &M) -> anyhow::Result<()> {
        self.records.push(Record {
            table: M::TABLE,
            value: serde_json::to_value(row)?,
        });
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records of one table, in write order.
    pub fn rows(&self, table: Table) -> Vec<&serde_json::Value> {
        self.records
            .iter()
            .filter(|r| r.table == table)
            .map(|r| &r.value)
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Destination of indexed rows. A batch is written atomically; rows whose
/// key already exists are ignored.
#[async_trait]
pub trait StorageSink: Send + Sync + 'static {
    async fn persist_batch(&self, rows: &[&dyn Persistable]) -> anyhow::Result<()>;
}
