// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crawld-engine: the per-execution logging engine
//!
//! One [`LogEngine`] exists per crawl execution. Producers log through the
//! [`LogSink`] façade; subscribers receive a live event feed with bounded
//! replay through [`LogEngine::subscribe`]; the [`JobScope`] guard owns the
//! terminal-record and archival handoff.

mod broker;
mod heartbeat;
mod lifecycle;
mod logger;
mod metrics;
mod normalize;
mod registry;
mod ring;
mod throttle;

pub use broker::{EventFilter, StreamEvent, SubscriberOptions, Subscription};
pub use heartbeat::{Heartbeat, QueueDepthProbe};
pub use lifecycle::{FinishError, JobScope};
pub use logger::{JobContext, LogEngine, LogSink, ScopedLogger, WeakLogEngine};
pub use metrics::{MetricsAccumulator, MetricsSnapshot};
pub use normalize::normalize_error;
pub use registry::EngineRegistry;
pub use ring::RingBuffer;
pub use throttle::TokenBucket;
