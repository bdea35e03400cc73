// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BatchWriter, Persistable, SCHEMA_VERSION, StorageSink};
use crate::tasks::Table;

/// Keeps every persisted row in memory, grouped by table. Re-inserting an
/// identical row is a no-op.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<Table, Vec<serde_json::Value>>>,
    batches: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: Table) -> Vec<serde_json::Value> {
        self.tables.lock().get(&table).cloned().unwrap_or_default()
    }

    pub fn len(&self, table: Table) -> usize {
        self.tables.lock().get(&table).map_or(0, Vec::len)
    }

    /// Number of batches persisted so far.
    pub fn batches(&self) -> usize {
        *self.batches.lock()
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    async fn persist_batch(&self, rows: &[&dyn Persistable]) -> anyhow::Result<()> {
        let mut writer = BatchWriter::new(SCHEMA_VERSION);
        for row in rows {
            row.persist(&mut writer)?;
        }
        let mut tables = self.tables.lock();
        for record in writer.into_records() {
            let stored = tables.entry(record.table).or_default();
            if !stored.contains(&record.value) {
                stored.push(record.value);
            }
        }
        *self.batches.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Model;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        height: i64,
        id: &'static str,
    }

    impl Model for Row {
        const TABLE: Table = Table::Actors;
    }

    #[tokio::test]
    async fn duplicates_are_ignored() {
        let sink = MemorySink::new();
        let a = Row { height: 1, id: "f01" };
        let b = Row { height: 1, id: "f02" };
        sink.persist_batch(&[&a, &b]).await.unwrap();
        sink.persist_batch(&[&a]).await.unwrap();
        assert_eq!(sink.len(Table::Actors), 2);
        assert_eq!(sink.len(Table::Messages), 0);
        assert_eq!(sink.batches(), 2);
        assert_eq!(sink.rows(Table::Actors)[1]["id"], "f02");
    }
}
