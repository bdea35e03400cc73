// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use prometheus_client::metrics::{counter::Counter, histogram::Histogram};
use std::sync::LazyLock;

pub static TIPSETS_INDEXED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "indexer_tipsets_indexed",
        "Tipsets whose every task completed",
        metric.clone(),
    );
    metric
});

pub static TIPSETS_FAILED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "indexer_tipsets_failed",
        "Tipsets with at least one failed task",
        metric.clone(),
    );
    metric
});

pub static INDEX_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    let metric = crate::metrics::default_histogram();
    crate::metrics::default_registry().register(
        "indexer_tipset_duration_seconds",
        "Duration of indexing one tipset",
        metric.clone(),
    );
    metric
});
