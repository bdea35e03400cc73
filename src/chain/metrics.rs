// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::metrics::KindLabel;
use prometheus_client::metrics::{counter::Counter, family::Family};
use std::sync::LazyLock;

pub static OBSERVER_DROPPED_EVENTS: LazyLock<Family<KindLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    crate::metrics::default_registry().register(
        "observer_dropped_events",
        "Head change events dropped because the observer buffer was full",
        metric.clone(),
    );
    metric
});
