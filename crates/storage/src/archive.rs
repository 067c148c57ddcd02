// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-log archival.
//!
//! On completion the lifecycle controller hands the ring contents to the
//! archiver, which serializes them as newline-delimited JSON and uploads a
//! single object per execution. The first line is a synthetic header record
//! declaring completeness, so readers know whether earlier records were
//! evicted without parsing the whole blob.

use crate::object_store::{ObjectStore, StoreError};
use chrono::Utc;
use crawld_core::{
    ArchiveNotice, Category, Completeness, ExecutionId, FieldValue, JobId, LogLevel, LogRecord,
};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Message of the synthetic first record of every archive.
pub const ARCHIVE_HEADER_MESSAGE: &str = "Archive header";

/// Default bound on one upload attempt.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the archival path. All are terminal for the execution's
/// archive; the engine converts them into an `archive_failed` record.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Object key for one execution's archived log.
pub fn object_key(job_id: &JobId, execution_id: &ExecutionId) -> String {
    format!("jobs/{}/executions/{}.ndjson", job_id, execution_id)
}

/// Uploads one execution's records to the object store.
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
    enabled: bool,
    timeout: Duration,
}

impl Archiver {
    pub fn new(store: Arc<dyn ObjectStore>, enabled: bool) -> Self {
        Self {
            store,
            enabled,
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serialize and upload `records` for one execution.
    ///
    /// `truncated_prefix` is the number of records evicted from the ring
    /// before archival; non-zero makes the archive `tail_only`. When
    /// archival is disabled, nothing is uploaded and the returned notice
    /// carries a null object key.
    pub async fn archive(
        &self,
        job_id: &JobId,
        execution_id: &ExecutionId,
        records: &[Arc<LogRecord>],
        truncated_prefix: u64,
    ) -> Result<ArchiveNotice, ArchiveError> {
        let completeness = if truncated_prefix == 0 {
            Completeness::Full
        } else {
            Completeness::TailOnly
        };
        let record_count = records.len() as u64;

        if !self.enabled {
            return Ok(ArchiveNotice {
                job_id: job_id.clone(),
                execution_id: execution_id.clone(),
                object_key: None,
                size_bytes: 0,
                record_count,
                completeness,
            });
        }

        let header = header_record(job_id, execution_id, records, completeness, truncated_prefix);
        let mut body = serde_json::to_string(&header)?;
        body.push('\n');
        for record in records {
            body.push_str(&serde_json::to_string(record.as_ref())?);
            body.push('\n');
        }

        let key = object_key(job_id, execution_id);
        let bytes = body.into_bytes();
        let size_bytes = bytes.len() as u64;

        match tokio::time::timeout(self.timeout, self.store.put(&key, bytes)).await {
            Ok(Ok(())) => {
                tracing::debug!(
                    job_id = %job_id,
                    execution_id = %execution_id,
                    key = %key,
                    size_bytes,
                    "archived execution log"
                );
                Ok(ArchiveNotice {
                    job_id: job_id.clone(),
                    execution_id: execution_id.clone(),
                    object_key: Some(key),
                    size_bytes,
                    record_count,
                    completeness,
                })
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ArchiveError::Timeout(self.timeout)),
        }
    }
}

fn header_record(
    job_id: &JobId,
    execution_id: &ExecutionId,
    records: &[Arc<LogRecord>],
    completeness: Completeness,
    truncated_prefix: u64,
) -> LogRecord {
    let timestamp = records
        .first()
        .map(|r| r.timestamp)
        .unwrap_or_else(Utc::now);

    let mut fields = IndexMap::new();
    fields.insert(
        "completeness".to_string(),
        FieldValue::from(completeness.to_string()),
    );
    if completeness == Completeness::TailOnly {
        fields.insert(
            "truncated_prefix".to_string(),
            FieldValue::from(truncated_prefix),
        );
    }
    fields.insert(
        "record_count".to_string(),
        FieldValue::from(records.len()),
    );

    LogRecord::new(
        timestamp,
        LogLevel::Info,
        Category::Lifecycle,
        ARCHIVE_HEADER_MESSAGE,
        job_id.clone(),
        execution_id.clone(),
        fields,
    )
}

/// Read the last `limit` records of an archived execution log.
///
/// The header record is not part of the returned lines. Returns `None`
/// when the object does not exist.
pub async fn read_tail(
    store: &dyn ObjectStore,
    key: &str,
    limit: usize,
) -> Result<Option<Vec<LogRecord>>, ArchiveError> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(&bytes);
    let mut records: Vec<LogRecord> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping unparseable archive line");
                continue;
            }
        };
        if record.message == ARCHIVE_HEADER_MESSAGE && record.category == Category::Lifecycle {
            continue;
        }
        records.push(record);
    }

    let start = records.len().saturating_sub(limit);
    Ok(Some(records.split_off(start)))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
