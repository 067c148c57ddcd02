// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling tail fallback.
//!
//! Running jobs serve the live ring; finished jobs serve the last lines
//! of the most recent archived blob for the job.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crawld_core::LogRecord;
use crawld_storage::read_tail;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TailParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TailResponse {
    pub source: &'static str,
    pub lines: Vec<LogRecord>,
}

pub async fn tail_logs(
    Path(job_id): Path<String>,
    Query(params): Query<TailParams>,
    State(state): State<AppState>,
) -> Result<Json<TailResponse>, StatusCode> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    if let Some(engine) = state.registry.get(&job_id) {
        if !engine.is_closed() {
            let lines = engine
                .read_last(limit)
                .iter()
                .map(|record| record.as_ref().clone())
                .collect();
            return Ok(Json(TailResponse {
                source: "live",
                lines,
            }));
        }
    }

    // Finished or unknown to the registry: look for the newest archive.
    let prefix = format!("jobs/{}/executions/", job_id);
    let keys = state.store.list(&prefix).await.map_err(|e| {
        tracing::warn!(job_id, error = %e, "archive listing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let Some(key) = keys.last() else {
        return Err(StatusCode::NOT_FOUND);
    };

    let lines = read_tail(state.store.as_ref(), key, limit)
        .await
        .map_err(|e| {
            tracing::warn!(job_id, key, error = %e, "archive tail read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(TailResponse {
        source: "archived",
        lines,
    }))
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
