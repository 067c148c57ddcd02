// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle controller: guaranteed terminal emission and archival.
//!
//! [`JobScope`] is the scope guard the scheduler holds while a crawl runs.
//! Exactly one of `Job completed` / `Job failed` is emitted per engine no
//! matter how the scope exits: the explicit [`complete`](JobScope::complete)
//! and [`fail`](JobScope::fail) paths run the full finish sequence inline
//! (and surface archive errors), while `Drop` covers panics, cancellation,
//! and early returns by emitting the terminal record synchronously and
//! finishing archival on a detached task.

use crate::heartbeat::{Heartbeat, QueueDepthProbe};
use crate::logger::LogEngine;
use crawld_core::{ArchiveNotice, Completeness};
use crawld_storage::{ArchiveError, Archiver};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Terminal error reported to the scheduler from the finish path.
#[derive(Debug, Error)]
pub enum FinishError {
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
}

/// Scope guard owning heartbeat, terminal emission, and archival handoff.
pub struct JobScope {
    engine: LogEngine,
    archiver: Arc<Archiver>,
    heartbeat: Option<Heartbeat>,
    finished: bool,
}

impl JobScope {
    /// Enter the logging scope for one execution.
    ///
    /// Spawns the heartbeat; the cleanup guarantee is installed here,
    /// before any fallible work the caller does.
    pub fn begin(
        engine: LogEngine,
        archiver: Arc<Archiver>,
        probe: Option<Arc<dyn QueueDepthProbe>>,
    ) -> Self {
        let heartbeat = Heartbeat::spawn(engine.clone(), probe);
        Self {
            engine,
            archiver,
            heartbeat: Some(heartbeat),
            finished: false,
        }
    }

    pub fn logger(&self) -> &LogEngine {
        &self.engine
    }

    /// Finish the execution successfully.
    pub async fn complete(mut self) -> Result<ArchiveNotice, FinishError> {
        self.finish(None).await
    }

    /// Finish the execution as failed; `error` lands on the terminal record.
    pub async fn fail(mut self, error: impl fmt::Display) -> Result<ArchiveNotice, FinishError> {
        self.finish(Some(error.to_string())).await
    }

    async fn finish(&mut self, error: Option<String>) -> Result<ArchiveNotice, FinishError> {
        self.finished = true;
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop().await;
        }

        self.engine.emit_terminal(error);
        self.engine.flush();

        Ok(run_archive(&self.engine, &self.archiver).await?)
    }
}

impl Drop for JobScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop_now();
        }

        // Reaching Drop unfinished means the job never completed: panic,
        // cancellation, or an early return without complete()/fail().
        self.engine
            .emit_terminal(Some("job scope dropped before completion".to_string()));
        self.engine.flush();

        let engine = self.engine.clone();
        let archiver = Arc::clone(&self.archiver);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = run_archive(&engine, &archiver).await;
                });
            }
            Err(_) => {
                // No runtime left to archive on; still release subscribers.
                tracing::warn!(
                    job_id = %engine.job_id(),
                    execution_id = %engine.execution_id(),
                    "engine dropped outside a runtime; skipping archive"
                );
                engine.finish_archived(unarchived_notice(&engine));
            }
        }
    }
}

/// Archive the ring snapshot and notify subscribers of the outcome.
///
/// On failure an `archive_failed` error record is emitted and the
/// `archived` event carries a null object key; either way the broker is
/// closed afterwards.
async fn run_archive(engine: &LogEngine, archiver: &Archiver) -> Result<ArchiveNotice, ArchiveError> {
    let (records, truncated_prefix) = engine.snapshot_for_archive();
    let outcome = archiver
        .archive(
            engine.job_id(),
            engine.execution_id(),
            &records,
            truncated_prefix,
        )
        .await;

    match outcome {
        Ok(notice) => {
            engine.finish_archived(notice.clone());
            Ok(notice)
        }
        Err(e) => {
            tracing::warn!(
                job_id = %engine.job_id(),
                execution_id = %engine.execution_id(),
                error = %e,
                "archive upload failed"
            );
            engine.emit_archive_failed(&e);
            engine.finish_archived(unarchived_notice(engine));
            Err(e)
        }
    }
}

fn unarchived_notice(engine: &LogEngine) -> ArchiveNotice {
    let (records, truncated_prefix) = engine.snapshot_for_archive();
    ArchiveNotice {
        job_id: engine.job_id().clone(),
        execution_id: engine.execution_id().clone(),
        object_key: None,
        size_bytes: 0,
        record_count: records.len() as u64,
        completeness: if truncated_prefix == 0 {
            Completeness::Full
        } else {
            Completeness::TailOnly
        },
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
