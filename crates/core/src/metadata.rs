// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job context snapshot sent once to each new subscriber.

use crate::id::{ExecutionId, JobId};
use crate::time_fmt;
use crate::verbosity::Verbosity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The engine configuration a subscriber needs to interpret the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub throttle_enabled: bool,
    pub max_logs_per_sec: u32,
    pub archive_enabled: bool,
    pub replay_buffer_size: usize,
}

/// Immutable job context, sent exactly once per subscriber immediately
/// after the `connected` handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: JobId,
    pub execution_id: ExecutionId,
    pub crawler: String,
    pub source_name: String,
    pub source_url: String,
    pub verbosity: Verbosity,
    #[serde(with = "time_fmt::rfc3339_ms")]
    pub started_at: DateTime<Utc>,
    pub config: ConfigSnapshot,
}
