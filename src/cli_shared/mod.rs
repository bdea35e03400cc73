// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod cli;
pub mod logger;

use std::path::Path;

use anyhow::Context as _;

use crate::cli_shared::cli::Config;
use crate::utils::io::read_toml;

/// Reads the configuration at `path`, falling back to the defaults when no
/// file exists there.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let config: Config = if path.exists() {
        let toml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        read_toml(&toml).with_context(|| format!("invalid configuration {}", path.display()))?
    } else {
        Config::default()
    };
    config.watcher.tables()?;
    Ok(config)
}
