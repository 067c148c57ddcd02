// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic lifecycle heartbeat.
//!
//! A background tokio task emits an `info`/`lifecycle` record at a fixed
//! interval carrying a snapshot of the in-flight metrics. The lifecycle
//! controller stops it before the terminal record goes out.

use crate::logger::LogEngine;
use crawld_core::{fields, Category, FieldValue, LogLevel};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Narrow probe into crawler-owned state, wired at construction. The
/// engine keeps no other reference to the crawler.
pub trait QueueDepthProbe: Send + Sync {
    /// Current frontier depth, if the crawler reports one.
    fn queue_depth(&self) -> Option<u64>;
}

/// Handle to the running heartbeat task.
pub struct Heartbeat {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Spawn the ticker on the current runtime.
    pub fn spawn(engine: LogEngine, probe: Option<Arc<dyn QueueDepthProbe>>) -> Self {
        let interval = engine.settings().heartbeat_interval;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval() fires immediately; the first beat should wait.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => beat(&engine, probe.as_deref()),
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            stop_tx,
            task: Some(task),
        }
    }

    /// Stop the ticker and wait for the task to finish.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop without awaiting; used on the synchronous drop path.
    pub fn stop_now(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn beat(engine: &LogEngine, probe: Option<&dyn QueueDepthProbe>) {
    let snap = engine.metrics().snapshot();
    let mut fields = fields! {
        "pages_crawled" => snap.pages_crawled,
        "items_extracted" => snap.items_extracted,
        "errors_count" => snap.errors_count,
        "elapsed_ms" => engine.elapsed_ms(),
    };
    if let Some(depth) = probe.and_then(QueueDepthProbe::queue_depth) {
        fields.push(("queue_depth".to_string(), FieldValue::from(depth)));
    }

    engine.emit_unchecked(LogLevel::Info, Category::Lifecycle, "Heartbeat", fields);
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
