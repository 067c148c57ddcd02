// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario C: the per-job hard cap truncates the stream exactly once.

use crate::prelude::*;
use crawld_core::{fields, Category, Verbosity};
use crawld_engine::{LogSink, StreamEvent};

#[tokio::test]
async fn cap_truncates_exactly_once() {
    let engine = engine_with(|s| {
        s.verbosity = Verbosity::Debug;
        s.max_per_job = 10;
    });
    let mut sub = engine.subscribe();

    for n in 1..=12 {
        engine.debug(Category::Fetch, &format!("Fetching {n}"), fields! {});
    }

    sub.next().await.unwrap(); // connected
    sub.next().await.unwrap(); // metadata

    // Records 1..=10 arrive, then exactly one truncation event; emit #12
    // produced nothing on the wire.
    for n in 1..=10 {
        match sub.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                assert_eq!(record.message, format!("Fetching {n}"));
            }
            other => panic!("expected line, got {other:?}"),
        }
    }
    match sub.next().await.unwrap() {
        StreamEvent::Truncated { limit, .. } => assert_eq!(limit, 10),
        other => panic!("expected truncated, got {other:?}"),
    }

    assert_eq!(engine.metrics().logs_dropped_cap(), 2);
    assert_eq!(engine.metrics().logs_emitted(), 10);
    // Regular records plus the sentinel's own insertion.
    assert_eq!(engine.total_inserted(), 11);
}

#[tokio::test]
async fn records_after_the_sentinel_stay_silent() {
    let engine = engine_with(|s| s.max_per_job = 3);
    let mut sub = engine.subscribe();

    for n in 1..=8 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    sub.next().await.unwrap(); // connected
    sub.next().await.unwrap(); // metadata
    let mut truncated_seen = 0;
    let mut lines_seen = 0;
    for _ in 0..4 {
        match sub.next().await.unwrap() {
            StreamEvent::Line { .. } => lines_seen += 1,
            StreamEvent::Truncated { .. } => truncated_seen += 1,
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(lines_seen, 3);
    assert_eq!(truncated_seen, 1);
    assert_eq!(engine.metrics().logs_dropped_cap(), 5);
    assert_eq!(engine.total_inserted(), 4);
}
