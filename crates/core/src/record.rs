// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical log record.

use crate::category::Category;
use crate::field::FieldValue;
use crate::id::{ExecutionId, JobId};
use crate::time_fmt;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire schema version. Bumped on any non-backward-compatible change to
/// [`LogRecord`]; clients seeing an unknown version fall back to raw JSON.
pub const SCHEMA_VERSION: u32 = 1;

/// Record severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single structured log record. Immutable once created.
///
/// The message doubles as a stable key for metric roll-ups, so producers
/// keep it short and put variable detail in `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub schema_version: u32,
    #[serde(with = "time_fmt::rfc3339_ms")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: Category,
    pub message: String,
    pub job_id: JobId,
    pub execution_id: ExecutionId,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldValue>,
}

impl LogRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        category: Category,
        message: impl Into<String>,
        job_id: JobId,
        execution_id: ExecutionId,
        fields: IndexMap<String, FieldValue>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            timestamp,
            level,
            category,
            message: message.into(),
            job_id,
            execution_id,
            fields,
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
