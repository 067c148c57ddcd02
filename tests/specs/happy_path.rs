// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario A: a small successful crawl, observed end to end.

use crate::prelude::*;
use crawld_core::{fields, Category, FieldValue, LogLevel};
use crawld_engine::{JobScope, LogSink, StreamEvent};
use crawld_storage::ObjectStore;

#[tokio::test]
async fn happy_path_summary_and_subscriber_delivery() {
    let engine = engine_with(|s| {
        s.buffer_size = 1000;
        s.max_per_job = 50_000;
    });
    let (store, archiver) = memory_archiver();
    let scope = JobScope::begin(engine.clone(), archiver, None);

    // Subscriber connected before the first emit.
    let sub = engine.subscribe();

    engine.job_started("S1", "https://x/");
    for _ in 0..3 {
        engine.info(
            Category::Fetch,
            "Page fetched",
            fields! { "status" => 200, "bytes" => 1024 },
        );
    }
    engine.info(Category::Extract, "Content extracted", fields! { "items" => 2 });

    let notice = scope.complete().await.unwrap();
    assert_eq!(
        notice.object_key.as_deref(),
        Some("jobs/job-1/executions/exec-1.ndjson")
    );

    let events = collect_events(sub).await;
    let lines = line_messages(&events);
    assert_eq!(
        lines,
        vec![
            "Job started",
            "Page fetched",
            "Page fetched",
            "Page fetched",
            "Content extracted",
            "Job completed",
        ]
    );
    assert!(matches!(events.last().unwrap(), StreamEvent::Archived(_)));

    // Terminal record carries the aggregated summary.
    let terminal = events
        .iter()
        .find_map(|event| match event {
            StreamEvent::Line { record, .. } if record.message == "Job completed" => {
                Some(record.clone())
            }
            _ => None,
        })
        .unwrap();

    assert_eq!(terminal.level, LogLevel::Info);
    assert_eq!(terminal.category, Category::Lifecycle);
    assert_eq!(terminal.fields["pages_crawled"], FieldValue::Int(3));
    assert_eq!(terminal.fields["items_extracted"], FieldValue::Int(2));
    assert_eq!(terminal.fields["bytes_fetched"], FieldValue::Int(3072));
    assert_eq!(terminal.fields["errors_count"], FieldValue::Int(0));
    match &terminal.fields["status_codes"] {
        FieldValue::Map(codes) => assert_eq!(codes["200"], FieldValue::Int(3)),
        other => panic!("expected status_codes map, got {other:?}"),
    }

    // The archive holds header + the six records.
    let bytes = store
        .get("jobs/job-1/executions/exec-1.ndjson")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 7);
}
