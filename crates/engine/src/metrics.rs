// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution metrics accumulator.
//!
//! Counters are updated inline on the emit path, so everything here is
//! atomics plus two small mutexed maps (status-code histogram and the
//! top-errors tracker). The summary attached to the terminal record is
//! built from a snapshot of this state.

use crate::normalize::normalize_error;
use crawld_core::{Category, JobSummary, LogRecord, TopError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of normalized error keys reported in the summary.
const TOP_ERRORS_LIMIT: usize = 5;

#[derive(Debug, Clone)]
struct ErrorStat {
    count: u64,
    last_url: Option<String>,
    last_seen: u64,
}

/// Atomic counters derived from accepted records.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    pages_discovered: AtomicU64,
    pages_crawled: AtomicU64,
    items_extracted: AtomicU64,
    errors_count: AtomicU64,
    bytes_fetched: AtomicU64,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    logs_emitted: AtomicU64,
    logs_throttled: AtomicU64,
    logs_dropped_gate: AtomicU64,
    logs_dropped_cap: AtomicU64,
    engine_internal_error: AtomicU64,
    subscribers_disconnected_slow: AtomicU64,
    status_codes: Mutex<HashMap<u16, u64>>,
    top_errors: Mutex<HashMap<String, ErrorStat>>,
    error_seq: AtomicU64,
}

/// Point-in-time copy of the counters, used by the heartbeat and summary.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub pages_discovered: u64,
    pub pages_crawled: u64,
    pub items_extracted: u64,
    pub errors_count: u64,
    pub bytes_fetched: u64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub logs_emitted: u64,
    pub logs_throttled: u64,
    pub logs_dropped_gate: u64,
    pub logs_dropped_cap: u64,
    pub engine_internal_error: u64,
    pub subscribers_disconnected_slow: u64,
    pub status_codes: std::collections::BTreeMap<u16, u64>,
    pub top_errors: Vec<TopError>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category-driven counter updates for one accepted record.
    pub fn observe(&self, record: &LogRecord) {
        self.logs_emitted.fetch_add(1, Ordering::Relaxed);

        match &record.category {
            Category::Queue => {
                if record.message.contains("Link discovered")
                    || record.message.contains("Link queued")
                {
                    self.pages_discovered.fetch_add(1, Ordering::Relaxed);
                }
            }
            Category::Fetch => {
                if record.message.contains("Page fetched")
                    || record.message.contains("Response received")
                {
                    self.pages_crawled.fetch_add(1, Ordering::Relaxed);
                    self.total_requests.fetch_add(1, Ordering::Relaxed);

                    if let Some(status) = record.fields.get("status").and_then(|v| v.as_i64()) {
                        if let Ok(code) = u16::try_from(status) {
                            *self.status_codes.lock().entry(code).or_insert(0) += 1;
                            if code >= 400 {
                                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
                if let Some(bytes) = record.fields.get("bytes").and_then(|v| v.as_i64()) {
                    if let Ok(bytes) = u64::try_from(bytes) {
                        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
                    }
                }
            }
            Category::Extract => {
                if record.message.contains("Content extracted")
                    || record.message.ends_with("processed")
                {
                    // One item per record unless the producer counted them.
                    let items = record
                        .fields
                        .get("items")
                        .and_then(|v| v.as_i64())
                        .and_then(|n| u64::try_from(n).ok())
                        .unwrap_or(1);
                    self.items_extracted.fetch_add(items, Ordering::Relaxed);
                }
            }
            Category::Error => {
                self.errors_count.fetch_add(1, Ordering::Relaxed);
                self.track_error(record);
            }
            _ => {}
        }
    }

    fn track_error(&self, record: &LogRecord) {
        let key = normalize_error(&record.message);
        let url = record
            .fields
            .get("url")
            .and_then(|v| v.as_str())
            .map(String::from);
        let seen = self.error_seq.fetch_add(1, Ordering::Relaxed);

        let mut errors = self.top_errors.lock();
        let stat = errors.entry(key).or_insert(ErrorStat {
            count: 0,
            last_url: None,
            last_seen: 0,
        });
        stat.count += 1;
        stat.last_seen = seen;
        if url.is_some() {
            stat.last_url = url;
        }
    }

    /// New cumulative throttled count.
    pub fn inc_throttled(&self) -> u64 {
        self.logs_throttled.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_dropped_gate(&self) {
        self.logs_dropped_gate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped_cap(&self) {
        self.logs_dropped_cap.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_internal_error(&self) {
        self.engine_internal_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_disconnected_slow(&self) {
        self.subscribers_disconnected_slow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn logs_emitted(&self) -> u64 {
        self.logs_emitted.load(Ordering::Relaxed)
    }

    pub fn logs_throttled(&self) -> u64 {
        self.logs_throttled.load(Ordering::Relaxed)
    }

    pub fn logs_dropped_gate(&self) -> u64 {
        self.logs_dropped_gate.load(Ordering::Relaxed)
    }

    pub fn logs_dropped_cap(&self) -> u64 {
        self.logs_dropped_cap.load(Ordering::Relaxed)
    }

    pub fn subscribers_disconnected_slow(&self) -> u64 {
        self.subscribers_disconnected_slow.load(Ordering::Relaxed)
    }

    /// Copy all counters, the histogram, and the top-5 errors.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_discovered: self.pages_discovered.load(Ordering::Relaxed),
            pages_crawled: self.pages_crawled.load(Ordering::Relaxed),
            items_extracted: self.items_extracted.load(Ordering::Relaxed),
            errors_count: self.errors_count.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            logs_emitted: self.logs_emitted.load(Ordering::Relaxed),
            logs_throttled: self.logs_throttled.load(Ordering::Relaxed),
            logs_dropped_gate: self.logs_dropped_gate.load(Ordering::Relaxed),
            logs_dropped_cap: self.logs_dropped_cap.load(Ordering::Relaxed),
            engine_internal_error: self.engine_internal_error.load(Ordering::Relaxed),
            subscribers_disconnected_slow: self
                .subscribers_disconnected_slow
                .load(Ordering::Relaxed),
            status_codes: self.status_codes.lock().iter().map(|(k, v)| (*k, *v)).collect(),
            top_errors: self.top_errors_ranked(),
        }
    }

    fn top_errors_ranked(&self) -> Vec<TopError> {
        let errors = self.top_errors.lock();
        let mut ranked: Vec<(&String, &ErrorStat)> = errors.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count.cmp(&a.count).then(b.last_seen.cmp(&a.last_seen))
        });
        ranked
            .into_iter()
            .take(TOP_ERRORS_LIMIT)
            .map(|(message, stat)| TopError {
                message: message.clone(),
                count: stat.count,
                last_url: stat.last_url.clone(),
            })
            .collect()
    }

    /// Build the terminal summary from current counters.
    pub fn build_summary(&self, duration_ms: u64) -> JobSummary {
        let snap = self.snapshot();
        let attempted = snap.logs_emitted + snap.logs_throttled;
        let throttle_percent = if attempted == 0 {
            0.0
        } else {
            (snap.logs_throttled as f64 / attempted as f64) * 100.0
        };

        JobSummary {
            pages_discovered: snap.pages_discovered,
            pages_crawled: snap.pages_crawled,
            items_extracted: snap.items_extracted,
            errors_count: snap.errors_count,
            duration_ms,
            bytes_fetched: snap.bytes_fetched,
            total_requests: snap.total_requests,
            failed_requests: snap.failed_requests,
            status_codes: snap.status_codes,
            top_errors: snap.top_errors,
            logs_emitted: snap.logs_emitted,
            logs_throttled: snap.logs_throttled,
            throttle_percent,
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
