// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
use std::{path::PathBuf, str::FromStr};
use tracing_subscriber::filter::LevelFilter;

use crate::watcher::WatcherConfig;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub struct LogLevelFilter(pub LevelFilter);

impl Serialize for LogLevelFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.into_level() {
            Some(level) => serializer.serialize_str(level.as_str()),
            None => serializer.serialize_str("OFF"),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevelFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Case insensitive.
        let s = String::deserialize(deserializer)?;
        LevelFilter::from_str(&s)
            .map(LogLevelFilter)
            .map_err(|_| D::Error::unknown_variant(&s, &LOG_LEVEL_NAMES))
    }
}

static LOG_LEVEL_NAMES: [&str; 6] = ["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LogValue {
    pub module: String,
    pub level: LogLevelFilter,
}

impl LogValue {
    pub fn new(module: &str, level: LevelFilter) -> Self {
        Self {
            module: module.to_string(),
            level: LogLevelFilter(level),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub filters: Vec<LogValue>,
    /// Directory receiving hourly rotated log files.
    pub log_dir: Option<PathBuf>,
    /// Emit newline-delimited JSON instead of human readable lines.
    pub json: bool,
}

impl LogConfig {
    pub(in crate::cli_shared) fn to_filter_string(&self) -> String {
        self.filters
            .iter()
            .map(|f| format!("{}={}", f.module, f.level.0))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                LogValue::new("forest_indexer", LevelFilter::INFO),
                LogValue::new("fil_actors_shared", LevelFilter::WARN),
            ],
            log_dir: None,
            json: false,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub watcher: WatcherConfig,
    pub log: LogConfig,
}
