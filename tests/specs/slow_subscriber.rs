// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario E: a subscriber that never reads is evicted; fast
//! subscribers are unaffected.

use crate::prelude::*;
use crawld_core::{fields, Category, SlowSubscriberPolicy};
use crawld_engine::{LogSink, StreamEvent, SubscriberOptions};

#[tokio::test]
async fn slow_subscriber_is_disconnected_fast_one_keeps_everything() {
    let engine = engine_with(|s| {
        s.subscriber_channel_depth = 8;
        s.slow_subscriber_policy = SlowSubscriberPolicy::Disconnect;
    });

    // The slow reader never drains its queue.
    let mut slow = engine.subscribe();
    let mut fast = engine.subscribe_with(SubscriberOptions {
        channel_depth: 200,
        ..Default::default()
    });

    for n in 1..=100 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    assert_eq!(engine.metrics().subscribers_disconnected_slow(), 1);
    assert_eq!(engine.subscriber_count(), 1);

    // The slow subscriber got the handshake plus its queue depth of
    // lines, then its stream ended.
    assert!(matches!(
        slow.next().await.unwrap(),
        StreamEvent::Connected { .. }
    ));
    assert!(matches!(slow.next().await.unwrap(), StreamEvent::Metadata(_)));
    for n in 1..=8 {
        match slow.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                assert_eq!(record.message, format!("Page fetched {n}"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(slow.next().await.is_none());

    // The fast subscriber sees all 100 records.
    assert!(matches!(
        fast.next().await.unwrap(),
        StreamEvent::Connected { .. }
    ));
    assert!(matches!(fast.next().await.unwrap(), StreamEvent::Metadata(_)));
    for n in 1..=100 {
        match fast.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                assert_eq!(record.message, format!("Page fetched {n}"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn drop_oldest_policy_lags_instead_of_disconnecting() {
    let engine = engine_with(|s| {
        s.subscriber_channel_depth = 4;
        s.slow_subscriber_policy = SlowSubscriberPolicy::DropOldest;
    });
    let mut sub = engine.subscribe();

    for n in 1..=20 {
        engine.info(Category::Fetch, &format!("Page fetched {n}"), fields! {});
    }

    assert_eq!(engine.metrics().subscribers_disconnected_slow(), 0);
    assert_eq!(engine.subscriber_count(), 1);

    // The handshake was pushed out by the overflow; only the newest
    // events remain (queue depth plus the handshake slots).
    for n in 15..=20 {
        match sub.next().await.unwrap() {
            StreamEvent::Line { record, .. } => {
                assert_eq!(record.message, format!("Page fetched {n}"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
