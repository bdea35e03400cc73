// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use prometheus_client::metrics::{counter::Counter, gauge::Gauge};
use std::sync::LazyLock;

macro_rules! gauge {
    ($name:ident, $metric:literal, $help:literal) => {
        pub static $name: LazyLock<Gauge> = LazyLock::new(|| {
            let metric = Gauge::default();
            crate::metrics::default_registry().register($metric, $help, metric.clone());
            metric
        });
    };
}

macro_rules! counter {
    ($name:ident, $metric:literal, $help:literal) => {
        pub static $name: LazyLock<Counter> = LazyLock::new(|| {
            let metric = Counter::default();
            crate::metrics::default_registry().register($metric, $help, metric.clone());
            metric
        });
    };
}

gauge!(CACHE_SIZE, "watcher_cache_size", "Capacity of the tipset cache");
gauge!(CACHE_LEN, "watcher_cache_len", "Number of tipsets held by the tipset cache");
gauge!(
    CACHE_HEAD_HEIGHT,
    "watcher_cache_head_height",
    "Height of the newest cached tipset"
);
gauge!(
    CACHE_TAIL_HEIGHT,
    "watcher_cache_tail_height",
    "Height of the oldest cached tipset"
);
gauge!(
    POOL_ACTIVE_WORKERS,
    "watcher_pool_active_workers",
    "Indexing tasks currently running"
);
gauge!(
    POOL_QUEUE_DEPTH,
    "watcher_pool_queue_depth",
    "Indexing tasks submitted but not yet running"
);
counter!(
    EMPTY_REVERTS,
    "watcher_empty_reverts",
    "Reverts received while the tipset cache was empty"
);
counter!(
    OUT_OF_ORDER_ADDS,
    "watcher_out_of_order_adds",
    "Applied tipsets not above the cached head"
);
