// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crawld-server: HTTP surface for the job logging pipeline
//!
//! Two endpoints per job: a Server-Sent-Events stream of live log events
//! with bounded replay, and a polling tail fallback that serves the ring
//! for running jobs and the archived blob for finished ones.

pub mod env;
mod state;
mod stream;
mod tail;

pub use state::AppState;

use axum::routing::get;
use axum::Router;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/jobs/:job_id/logs/stream", get(stream::stream_logs))
        .route("/api/v1/jobs/:job_id/logs/tail", get(tail::tail_logs))
        .with_state(state)
}
