// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod blocks;
pub mod chain;
pub mod cli_shared;
pub mod container;
pub mod db;
pub mod diff;
pub mod extract;
pub mod indexer;
pub mod metrics;
pub mod model;
pub mod shim;
pub mod sink;
pub mod source;
pub mod tasks;
#[cfg(test)]
mod test_utils;
pub mod transform;
pub mod utils;
pub mod watcher;

pub use cli_shared::cli::Config;
pub use indexer::{Indexer, TipsetIndexer};
pub use sink::StorageSink;
pub use source::DataSource;
pub use watcher::{Watcher, WatcherConfig};
