// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs.

use crawld_core::LogSettings;
use crawld_engine::{JobContext, LogEngine, StreamEvent, Subscription};
use crawld_storage::{Archiver, MemoryObjectStore, ObjectStore};
use std::sync::Arc;

pub fn context() -> JobContext {
    JobContext {
        job_id: "job-1".into(),
        execution_id: "exec-1".into(),
        crawler: "rss".to_string(),
        source_name: "Example Feed".to_string(),
        source_url: "https://x/".to_string(),
    }
}

/// Engine with throttling off unless the scenario turns it back on.
pub fn engine_with(configure: impl FnOnce(&mut LogSettings)) -> LogEngine {
    let mut settings = LogSettings::default();
    settings.max_logs_per_sec = 0;
    configure(&mut settings);
    LogEngine::new(context(), settings)
}

pub fn memory_archiver() -> (Arc<MemoryObjectStore>, Arc<Archiver>) {
    let store = Arc::new(MemoryObjectStore::new());
    let archiver = Arc::new(Archiver::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        true,
    ));
    (store, archiver)
}

/// Drain a subscription until its stream ends.
pub async fn collect_events(mut sub: Subscription) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = sub.next().await {
        events.push(event);
    }
    events
}

/// Messages of the `log:line` events, in delivery order.
pub fn line_messages(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Line { record, .. } => Some(record.message.clone()),
            _ => None,
        })
        .collect()
}
