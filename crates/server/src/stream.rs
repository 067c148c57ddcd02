// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE log stream handler.
//!
//! Frames follow the stream protocol: `connected` → `log:metadata` →
//! optional `log:replay` → `log:line`s → optional `log:truncated` →
//! optional `log:archived`. The subscription is bound to the request:
//! when the client disconnects, dropping the stream cancels it and
//! pending broker pushes become no-ops.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use crawld_core::{Category, ExecutionId, JobId, LogLevel, LogRecord};
use crawld_engine::{EventFilter, StreamEvent, Subscription};
use futures::stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Minimum level for `log:line` events (`debug`..`error`).
    pub level: Option<String>,
    /// Restrict `log:line` events to one category (dotted wire name).
    pub category: Option<String>,
}

pub async fn stream_logs(
    Path(job_id): Path<String>,
    Query(params): Query<StreamParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.registry.get(&job_id).ok_or(StatusCode::NOT_FOUND)?;

    let subscription = match build_filter(&params)? {
        Some(filter) => engine.subscribe_filtered(filter),
        None => engine.subscribe(),
    };

    let stream = stream::unfold(subscription, |mut sub: Subscription| async move {
        let event = sub.next().await?;
        Some((Ok::<_, Infallible>(sse_event(&event)), sub))
    });

    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}

/// Level/category predicate over live lines; other event kinds pass.
fn build_filter(params: &StreamParams) -> Result<Option<EventFilter>, StatusCode> {
    let min_level = match params.level.as_deref() {
        None => None,
        Some(name) => Some(parse_level(name).ok_or(StatusCode::BAD_REQUEST)?),
    };
    let category = params.category.as_deref().map(Category::from);

    if min_level.is_none() && category.is_none() {
        return Ok(None);
    }

    let filter: EventFilter = Arc::new(move |event: &StreamEvent| match event {
        StreamEvent::Line { record, .. } => {
            min_level.is_none_or(|level| record.level >= level)
                && category.as_ref().is_none_or(|c| &record.category == c)
        }
        _ => true,
    });
    Ok(Some(filter))
}

fn parse_level(name: &str) -> Option<LogLevel> {
    match name {
        "debug" | "trace" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

#[derive(Serialize)]
struct ConnectedPayload<'a> {
    job_id: &'a JobId,
    execution_id: &'a ExecutionId,
}

#[derive(Serialize)]
struct ReplayPayload<'a> {
    count: usize,
    lines: &'a [Arc<LogRecord>],
}

#[derive(Serialize)]
struct TruncatedPayload<'a> {
    job_id: &'a JobId,
    execution_id: &'a ExecutionId,
    limit: u64,
}

/// Map a broker event onto an SSE frame.
fn sse_event(event: &StreamEvent) -> Event {
    match event {
        StreamEvent::Connected {
            job_id,
            execution_id,
        } => frame(
            "connected",
            &ConnectedPayload {
                job_id,
                execution_id,
            },
        ),
        StreamEvent::Metadata(metadata) => frame("log:metadata", metadata.as_ref()),
        StreamEvent::Replay { lines } => frame(
            "log:replay",
            &ReplayPayload {
                count: lines.len(),
                lines,
            },
        ),
        StreamEvent::Line { record, .. } => frame("log:line", record.as_ref()),
        StreamEvent::Truncated {
            job_id,
            execution_id,
            limit,
        } => frame(
            "log:truncated",
            &TruncatedPayload {
                job_id,
                execution_id,
                limit: *limit,
            },
        ),
        StreamEvent::Archived(notice) => frame("log:archived", notice),
    }
}

fn frame<T: Serialize>(kind: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(kind).data(data),
        Err(e) => {
            tracing::warn!(kind, error = %e, "failed to serialize stream event");
            Event::default().event(kind).data("{}")
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
