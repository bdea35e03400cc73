// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use super::impl_model;
use crate::shim::clock::ChainEpoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Ok,
    Info,
    Error,
}

/// Outcome of one task for one tipset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    pub height: ChainEpoch,
    pub state_root: String,
    pub reporter: String,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub status_information: Option<String>,
    pub errors_detected: Vec<String>,
}

impl_model! {
    ProcessingReport => ProcessingReports,
}
