// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting invariants: ordering, accounting, and lossless delivery.

use crate::prelude::*;
use crawld_core::{fields, Category, LogLevel, Verbosity};
use crawld_engine::{JobScope, LogSink, StreamEvent, SubscriberOptions};

#[tokio::test]
async fn timestamps_are_monotonic_across_mixed_traffic() {
    let engine = engine_with(|s| s.verbosity = Verbosity::Debug);

    engine.job_started("S1", "https://x/");
    for n in 0..300 {
        match n % 3 {
            0 => engine.debug(Category::Fetch, "Fetching", fields! { "n" => n }),
            1 => engine.info(Category::Fetch, "Page fetched", fields! { "n" => n }),
            _ => engine.warn(Category::RateLimit, "Backing off", fields! { "n" => n }),
        }
    }

    let records = engine.read_last(1000);
    for pair in records.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "timestamp went backward: {} then {}",
            pair[0].timestamp,
            pair[1].timestamp
        );
    }
}

#[tokio::test]
async fn accounting_identity_holds() {
    let engine = engine_with(|s| {
        s.verbosity = Verbosity::Normal;
        s.max_per_job = 50;
    });

    let attempts = 200u64;
    for n in 0..attempts {
        match n % 4 {
            0 => engine.debug(Category::Fetch, "Fetching", fields! {}),
            1 => engine.info(Category::Fetch, "Page fetched", fields! {}),
            2 => engine.warn(Category::Fetch, "Retrying", fields! {}),
            _ => engine.error(Category::Error, "Fetch failed", fields! {}),
        }
    }

    let m = engine.metrics();
    assert_eq!(
        m.logs_emitted() + m.logs_throttled() + m.logs_dropped_gate() + m.logs_dropped_cap(),
        attempts
    );
}

#[tokio::test]
async fn connected_subscriber_sees_every_accepted_record_exactly_once() {
    let engine = engine_with(|_| {});
    let (_store, archiver) = memory_archiver();
    let scope = JobScope::begin(engine.clone(), archiver, None);
    // Deep queue: this subscriber intentionally reads nothing until the
    // job is over, and must still see every record.
    let sub = engine.subscribe_with(SubscriberOptions {
        channel_depth: 1000,
        ..Default::default()
    });

    engine.job_started("S1", "https://x/");
    for n in 0..250 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }
    scope.complete().await.unwrap();

    let events = collect_events(sub).await;
    let delivered = line_messages(&events);

    let mut expected: Vec<String> = vec!["Job started".to_string()];
    expected.extend((0..250).map(|n| format!("Page fetched {n}")));
    expected.push("Job completed".to_string());

    assert_eq!(delivered, expected);
}

#[tokio::test]
async fn quiet_verbosity_keeps_debug_and_info_off_the_wire() {
    let engine = engine_with(|s| s.verbosity = Verbosity::Quiet);
    let mut sub = engine.subscribe();

    engine.debug(Category::Fetch, "Fetching", fields! {});
    engine.info(Category::Fetch, "Page fetched", fields! {});
    engine.warn(Category::Fetch, "Retrying", fields! {});

    sub.next().await.unwrap(); // connected
    sub.next().await.unwrap(); // metadata
    match sub.next().await.unwrap() {
        StreamEvent::Line { record, .. } => {
            assert_eq!(record.message, "Retrying");
            assert_eq!(record.level, LogLevel::Warn);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn ring_bound_holds_under_overflow() {
    let engine = engine_with(|s| s.buffer_size = 100);

    for n in 0..1000 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    let records = engine.read_last(1000);
    assert_eq!(records.len(), 100);
    assert_eq!(records[0].message, "Page fetched 900");
    assert_eq!(engine.total_inserted(), 1000);
}

#[tokio::test]
async fn concurrent_producers_lose_nothing() {
    let engine = engine_with(|_| {});

    let mut handles = Vec::new();
    for worker in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            for n in 0..50 {
                engine.info(
                    Category::Fetch,
                    "Page fetched",
                    fields! { "worker" => worker, "n" => n },
                );
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(engine.metrics().logs_emitted(), 400);
    assert_eq!(engine.total_inserted(), 400);

    let records = engine.read_last(1000);
    for pair in records.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}
