// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Indexing of a single tipset: every enabled task runs against the pair
//! of the tipset and its executed parent, and its rows are persisted in one
//! batch together with a processing report.

mod metrics;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::blocks::Tipset;
use crate::container::DiffContainer;
use crate::db::MemoryDB;
use crate::extract::{DiffFamily, extract_state};
use crate::metrics::HistogramTimerExt as _;
use crate::model::{ProcessingReport, ReportStatus, Rows};
use crate::shim::version::ActorVersion;
use crate::sink::StorageSink;
use crate::source::DataSource;
use crate::tasks::{self, Table, Task, enabled_tasks};
use crate::transform::transform;

/// Indexes one tipset at a time. Called concurrently by the watcher's
/// worker pool.
#[async_trait]
pub trait Indexer: Send + Sync + 'static {
    async fn tipset(&self, ts: Arc<Tipset>, tables: &BTreeSet<Table>) -> anyhow::Result<()>;
}

struct Outcome {
    task: Task,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    result: anyhow::Result<Rows>,
}

pub struct TipsetIndexer<S, K> {
    source: Arc<S>,
    sink: Arc<K>,
    name: String,
}

impl<S: DataSource, K: StorageSink> TipsetIndexer<S, K> {
    /// `name` identifies this indexer in processing reports.
    pub fn new(source: Arc<S>, sink: Arc<K>, name: impl Into<String>) -> Self {
        Self {
            source,
            sink,
            name: name.into(),
        }
    }

    /// Diffs the actor states of the pair and round-trips the result
    /// through a task-local store.
    async fn actor_state(
        &self,
        current: &Arc<Tipset>,
        executed: &Arc<Tipset>,
        families: BTreeSet<DiffFamily>,
    ) -> anyhow::Result<DiffContainer> {
        let version =
            ActorVersion::from_network_version(self.source.network_version(current.epoch()))?;
        let changes = self
            .source
            .actor_state_changes(current, executed)
            .await
            .context("failed to get actor state changes")?;
        let store = self.source.store().clone();
        let codes = self.source.actor_codes().clone();
        let (current, executed) = (current.clone(), executed.clone());
        tokio::task::spawn_blocking(move || {
            let container = extract_state(
                store.as_ref(),
                &codes,
                &current,
                &executed,
                version,
                &changes,
                &families,
            )?;
            let scratch = MemoryDB::default();
            let root = container.save(&scratch)?;
            debug!(height = current.epoch(), %root, "saved actor state diff");
            DiffContainer::load(&scratch, &root)
        })
        .await?
    }

    fn report(&self, current: &Tipset, outcome: &Outcome) -> ProcessingReport {
        let mut errors_detected = Vec::new();
        let (status, status_information) = match &outcome.result {
            Err(e) => {
                errors_detected.push(format!("{e:#}"));
                (ReportStatus::Error, Some("task failed".to_string()))
            }
            Ok(rows) if !rows.errors().is_empty() => {
                errors_detected.extend(rows.errors().iter().cloned());
                (ReportStatus::Error, Some("rows failed".to_string()))
            }
            Ok(rows) if rows.is_empty() => (ReportStatus::Info, Some("no rows".to_string())),
            Ok(_) => (ReportStatus::Ok, None),
        };
        ProcessingReport {
            height: current.epoch(),
            state_root: current.parent_state().to_string(),
            reporter: self.name.clone(),
            task: outcome.task.to_string(),
            started_at: outcome.started_at,
            completed_at: outcome.completed_at,
            status,
            status_information,
            errors_detected,
        }
    }
}

#[async_trait]
impl<S: DataSource, K: StorageSink> Indexer for TipsetIndexer<S, K> {
    async fn tipset(&self, current: Arc<Tipset>, tables: &BTreeSet<Table>) -> anyhow::Result<()> {
        let _timer = metrics::INDEX_DURATION.start_timer();
        let height = current.epoch();
        let tasks = enabled_tasks(tables);
        debug!(height, tasks = tasks.len(), "indexing tipset");

        let executed = self
            .source
            .tipset(current.parents())
            .await
            .with_context(|| format!("failed to get parent of tipset {current}"))?;

        let families: BTreeSet<DiffFamily> =
            tasks.iter().filter_map(|t| t.diff_family()).collect();
        let state_started = Utc::now();
        let container = if families.is_empty() {
            None
        } else {
            Some(
                self.actor_state(&current, &executed, families)
                    .await
                    .map_err(|e| format!("{e:#}")),
            )
        };
        let state_completed = Utc::now();

        let chain_tasks = tasks.iter().filter(|t| t.diff_family().is_none()).map(|&task| {
            let (current, executed) = (&current, &executed);
            async move {
                let started_at = Utc::now();
                let result = tasks::extract(task, self.source.as_ref(), current, executed).await;
                Outcome {
                    task,
                    started_at,
                    completed_at: Utc::now(),
                    result,
                }
            }
        });
        let mut outcomes = join_all(chain_tasks).await;
        if let Some(container) = &container {
            outcomes.extend(tasks.iter().filter(|t| t.diff_family().is_some()).map(|&task| {
                Outcome {
                    task,
                    started_at: state_started,
                    completed_at: state_completed,
                    result: match container {
                        Ok(container) => Ok(transform(task, &current, container)),
                        Err(e) => Err(anyhow::anyhow!("actor state extraction failed: {e}")),
                    },
                }
            }));
        }
        outcomes.sort_by_key(|o| o.task);

        let mut first_error = None;
        for mut outcome in outcomes {
            if let Ok(rows) = &mut outcome.result {
                rows.retain_tables(tables);
            }
            let report = self.report(&current, &outcome);
            if report.status == ReportStatus::Error {
                warn!(height, task = %outcome.task, errors = ?report.errors_detected, "task failed");
            }
            let mut batch = match &outcome.result {
                Ok(rows) => rows.as_refs(),
                Err(_) => Vec::new(),
            };
            batch.push(&report);
            let persisted = self
                .sink
                .persist_batch(&batch)
                .await
                .with_context(|| format!("failed to persist {} rows", outcome.task));
            drop(batch);
            let failure = outcome.result.err().or(persisted.err());
            if first_error.is_none() {
                first_error = failure;
            }
        }

        match first_error {
            None => {
                metrics::TIPSETS_INDEXED.inc();
                info!(height, "indexed tipset");
                Ok(())
            }
            Some(e) => {
                metrics::TIPSETS_FAILED.inc();
                Err(e.context(format!("failed to index tipset at height {height}")))
            }
        }
    }
}
