// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario B: a late subscriber gets the replay window, then live
//! events, with no duplicates and no gaps.

use crate::prelude::*;
use crawld_core::{fields, Category};
use crawld_engine::{LogSink, StreamEvent};

#[tokio::test]
async fn late_subscriber_replay_window() {
    let engine = engine_with(|s| {
        s.buffer_size = 1000;
        s.replay_buffer_size = 200;
    });

    for n in 1..=500 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    let mut sub = engine.subscribe();

    assert!(matches!(
        sub.next().await.unwrap(),
        StreamEvent::Connected { .. }
    ));
    assert!(matches!(sub.next().await.unwrap(), StreamEvent::Metadata(_)));

    match sub.next().await.unwrap() {
        StreamEvent::Replay { lines } => {
            assert_eq!(lines.len(), 200);
            assert_eq!(lines[0].message, "Page fetched 301");
            assert_eq!(lines[199].message, "Page fetched 500");
        }
        other => panic!("expected replay, got {other:?}"),
    }

    // Live emits after subscription arrive exactly once.
    for n in 501..=503 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }
    for n in 501..=503 {
        match sub.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                assert_eq!(record.message, format!("Page fetched {n}"));
            }
            other => panic!("expected line, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn replay_window_never_exceeds_ring_contents() {
    let engine = engine_with(|s| {
        s.buffer_size = 50;
        s.replay_buffer_size = 200;
    });

    for n in 1..=80 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    let mut sub = engine.subscribe();
    sub.next().await.unwrap(); // connected
    sub.next().await.unwrap(); // metadata
    match sub.next().await.unwrap() {
        StreamEvent::Replay { lines } => {
            // Window clamps to the ring capacity; oldest were evicted.
            assert_eq!(lines.len(), 50);
            assert_eq!(lines[0].message, "Page fetched 31");
        }
        other => panic!("expected replay, got {other:?}"),
    }
}
