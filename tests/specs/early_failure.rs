// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario F: the crawler fails immediately after the scope is entered.

use crate::prelude::*;
use crawld_core::{FieldValue, LogLevel};
use crawld_engine::JobScope;
use crawld_storage::ObjectStore;

#[tokio::test]
async fn immediate_crawler_error_still_terminates_and_archives() {
    let engine = engine_with(|_| {});
    let (store, archiver) = memory_archiver();
    let scope = JobScope::begin(engine.clone(), archiver, None);

    engine.job_started("S1", "https://x/");
    // The crawler returns an error before fetching anything.
    let notice = scope.fail("source returned HTTP 403").await.unwrap();
    assert!(notice.object_key.is_some());

    let bytes = store
        .get("jobs/job-1/executions/exec-1.ndjson")
        .await
        .unwrap()
        .unwrap();
    let records: Vec<crawld_core::LogRecord> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // Archive header + JobStarted + JobFailed, nothing else.
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].message, "Archive header");
    assert_eq!(records[1].message, "Job started");

    let terminal = &records[2];
    assert_eq!(terminal.message, "Job failed");
    assert_eq!(terminal.level, LogLevel::Error);
    assert_eq!(terminal.fields["pages_crawled"], FieldValue::Int(0));
    assert_eq!(terminal.fields["pages_discovered"], FieldValue::Int(0));
    assert_eq!(
        terminal.fields["error"],
        FieldValue::from("source returned HTTP 403")
    );
}

#[tokio::test]
async fn exactly_one_terminal_record_per_engine() {
    let engine = engine_with(|_| {});
    let (store, archiver) = memory_archiver();
    let scope = JobScope::begin(engine.clone(), archiver, None);

    engine.job_started("S1", "https://x/");
    scope.fail("boom").await.unwrap();

    let bytes = store
        .get("jobs/job-1/executions/exec-1.ndjson")
        .await
        .unwrap()
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let terminals = text
        .lines()
        .filter(|l| l.contains("\"Job failed\"") || l.contains("\"Job completed\""))
        .count();
    assert_eq!(terminals, 1);
}
