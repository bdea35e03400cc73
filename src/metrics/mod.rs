// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{encoding::EncodeLabelSet, metrics::histogram::Histogram};
use std::sync::LazyLock;
use std::time::Instant;

static DEFAULT_REGISTRY: LazyLock<RwLock<prometheus_client::registry::Registry>> =
    LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, prometheus_client::registry::Registry> {
    DEFAULT_REGISTRY.write()
}

/// Renders every registered metric in the text exposition format.
pub fn encode() -> anyhow::Result<String> {
    let mut metrics = String::new();
    prometheus_client::encoding::text::encode_registry(&mut metrics, &DEFAULT_REGISTRY.read())?;
    prometheus_client::encoding::text::encode_eof(&mut metrics)?;
    Ok(metrics)
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet, derive_more::Constructor)]
pub struct KindLabel {
    kind: &'static str,
}

pub mod values {
    use super::KindLabel;

    pub const APPLY: KindLabel = KindLabel::new("apply");
    pub const REVERT: KindLabel = KindLabel::new("revert");
}

pub fn default_histogram() -> Histogram {
    // Default values from go client(https://github.com/prometheus/client_golang/blob/5d584e2717ef525673736d72cd1d12e304f243d7/prometheus/histogram.go#L68)
    Histogram::new([
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ])
}

pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

pub trait HistogramTimerExt {
    fn start_timer(&self) -> HistogramTimer<'_>;
}

impl HistogramTimerExt for Histogram {
    fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            start: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::metrics::counter::Counter;

    #[test]
    fn encodes_registered_metrics() {
        let counter = Counter::<u64>::default();
        default_registry().register("encode_check", "Encoding check counter", counter.clone());
        counter.inc();
        let text = encode().unwrap();
        assert!(text.contains("encode_check_total 1"));
        assert!(text.ends_with("# EOF\n"));
    }
}
