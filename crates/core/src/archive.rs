// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive result types shared between the engine, storage, and HTTP layers.

use crate::id::{ExecutionId, JobId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the archived blob contains, declared by its header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Every record the execution accepted.
    Full,
    /// Only the ring tail; earlier records were evicted before archival.
    TailOnly,
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completeness::Full => write!(f, "full"),
            Completeness::TailOnly => write!(f, "tail_only"),
        }
    }
}

/// Payload of the terminal `archived` event.
///
/// `object_key` is `None` when archival is disabled or failed; the rest of
/// the fields still describe what would have been (or was) written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveNotice {
    pub job_id: JobId,
    pub execution_id: ExecutionId,
    pub object_key: Option<String>,
    pub size_bytes: u64,
    pub record_count: u64,
    pub completeness: Completeness,
}
