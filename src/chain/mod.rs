// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod cache;
mod metrics;
mod observer;

pub use cache::{Error, TipSetCache};
pub use observer::{HeadEvent, HeadObserver};
