// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tracing_subscriber::{EnvFilter, Registry, prelude::*};

use crate::cli_shared::cli::LogConfig;

type BoxedLayer = Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync>;

/// Installs the global subscriber: a console layer, plus an hourly rotated
/// file layer when `log_dir` is set. Fails if a subscriber is already set.
pub fn setup_logger(config: &LogConfig) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)?];

    // file logger
    if let Some(log_dir) = &config.log_dir {
        let file_appender = tracing_appender::rolling::hourly(log_dir, "forest-indexer.log");
        let layer = tracing_subscriber::fmt::Layer::new()
            .with_ansi(false)
            .with_writer(file_appender);
        let filter = get_env_filter(default_env_filter(config)?);
        let layer: BoxedLayer = if config.json {
            Box::new(layer.json().with_filter(filter))
        } else {
            Box::new(layer.with_filter(filter))
        };
        layers.push(layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

fn console_layer(config: &LogConfig) -> anyhow::Result<BoxedLayer> {
    let filter = get_env_filter(default_env_filter(config)?);
    let layer = tracing_subscriber::fmt::Layer::new();
    let layer: BoxedLayer = if config.json {
        Box::new(layer.json().with_filter(filter))
    } else {
        Box::new(layer.with_filter(filter))
    };
    Ok(layer)
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable, or a default
/// - see [`default_env_filter`]
///
/// Note that [`tracing_subscriber::filter::Builder`] only allows a single default directive,
/// whereas we want to provide multiple.
fn get_env_filter(def: EnvFilter) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(s) => EnvFilter::new(s),
        Err(NotPresent) => def,
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

fn default_env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    let mut directives = vec!["info".to_string()];
    let filters = config.to_filter_string();
    if !filters.is_empty() {
        directives.push(filters);
    }
    Ok(EnvFilter::try_new(directives.join(","))?)
}
