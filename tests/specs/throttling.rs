// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario D: debug records are throttled; one self-report appears.

use crate::prelude::*;
use crawld_core::{fields, Category, LogLevel, Verbosity};
use crawld_engine::{LogSink, StreamEvent};

#[tokio::test]
async fn debug_burst_is_throttled_with_one_self_report() {
    let engine = engine_with(|s| {
        s.verbosity = Verbosity::Debug;
        s.max_logs_per_sec = 5;
    });
    let mut sub = engine.subscribe();

    // One burst, far faster than one second.
    for n in 1..=20 {
        engine.debug(Category::Fetch, &format!("Fetching {n}"), fields! {});
    }

    let throttled = engine.metrics().logs_throttled();
    assert!(throttled >= 15, "throttled = {throttled}");

    sub.next().await.unwrap(); // connected
    sub.next().await.unwrap(); // metadata

    let mut debug_delivered = 0;
    let mut self_reports = 0;
    let expected_events = (20 - throttled) + 1;
    for _ in 0..expected_events {
        match sub.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                if record.level == LogLevel::Debug {
                    debug_delivered += 1;
                } else {
                    assert_eq!(record.level, LogLevel::Warn);
                    assert_eq!(record.category, Category::Metrics);
                    assert_eq!(record.message, "Log rate limit active");
                    assert!(record.fields["logs_throttled"].as_i64().unwrap() >= 1);
                    self_reports += 1;
                }
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert!(debug_delivered <= 5, "delivered = {debug_delivered}");
    assert_eq!(self_reports, 1);
}

#[tokio::test]
async fn zero_rate_never_emits_a_throttle_record() {
    let engine = engine_with(|s| {
        s.verbosity = Verbosity::Debug;
        s.max_logs_per_sec = 0;
    });

    for n in 1..=1000 {
        engine.debug(Category::Fetch, &format!("Fetching {n}"), fields! {});
    }

    assert_eq!(engine.metrics().logs_throttled(), 0);
    assert_eq!(engine.total_inserted(), 1000);
    assert!(engine
        .read_last(1000)
        .iter()
        .all(|r| r.message != "Log rate limit active"));
}
