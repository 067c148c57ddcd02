// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-execution logger façade.
//!
//! [`LogEngine`] is the thread-safe handle producers log through. Every
//! emit runs the admission pipeline (verbosity gate → hard cap → field
//! merge → throttle → build → publish → metrics) and never returns an
//! error: internal failures are absorbed into metrics and tracing.
//!
//! Record construction, ring insertion, and broker publish happen under a
//! single publish lock, which is what gives subscribers gap-free replay
//! and a monotonic timestamp order.

use crate::broker::{Broker, StreamEvent, SubscriberOptions, Subscription};
use crate::metrics::MetricsAccumulator;
use crate::ring::RingBuffer;
use crate::throttle::TokenBucket;
use chrono::{DateTime, Utc};
use crawld_core::fields;
use crawld_core::{
    merge_fields, ArchiveNotice, Category, ConfigSnapshot, ExecutionId, FieldValue, Fields,
    JobId, JobMetadata, LogLevel, LogRecord,
};
use crawld_core::{LogSettings, Verbosity};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Minimum gap between throttle self-report records.
const THROTTLE_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Identity handed to the engine at construction.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub execution_id: ExecutionId,
    pub crawler: String,
    pub source_name: String,
    pub source_url: String,
}

struct EmitState {
    ring: RingBuffer<Arc<LogRecord>>,
    last_ts: DateTime<Utc>,
}

pub(crate) struct EngineInner {
    job_id: JobId,
    execution_id: ExecutionId,
    metadata: Arc<JobMetadata>,
    settings: LogSettings,
    emit: Mutex<EmitState>,
    broker: Broker,
    metrics: Arc<MetricsAccumulator>,
    throttle: Option<Mutex<TokenBucket>>,
    /// Regular (non-lifecycle) records accepted so far; compared to M.
    regular_accepted: AtomicU64,
    truncated: AtomicBool,
    terminal_emitted: AtomicBool,
    throttle_report_at: Mutex<Option<Instant>>,
    started: Instant,
    closed: AtomicBool,
    archived: Mutex<Option<ArchiveNotice>>,
}

/// Narrow producer-facing interface, implemented by the engine and by
/// scoped loggers. The crawler receives a `&dyn LogSink` and nothing else.
pub trait LogSink: Send + Sync {
    fn emit(&self, level: LogLevel, category: Category, message: &str, fields: Fields);

    fn is_debug_enabled(&self) -> bool;

    fn is_trace_enabled(&self) -> bool {
        self.is_debug_enabled()
    }

    /// Derive a logger carrying pre-set fields.
    fn with_fields(&self, fields: Fields) -> ScopedLogger;

    fn debug(&self, category: Category, message: &str, fields: Fields) {
        self.emit(LogLevel::Debug, category, message, fields);
    }

    fn info(&self, category: Category, message: &str, fields: Fields) {
        self.emit(LogLevel::Info, category, message, fields);
    }

    fn warn(&self, category: Category, message: &str, fields: Fields) {
        self.emit(LogLevel::Warn, category, message, fields);
    }

    fn error(&self, category: Category, message: &str, fields: Fields) {
        self.emit(LogLevel::Error, category, message, fields);
    }
}

/// Thread-safe per-execution logging engine. Cheap to clone.
#[derive(Clone)]
pub struct LogEngine {
    inner: Arc<EngineInner>,
}

impl LogEngine {
    pub fn new(context: JobContext, settings: LogSettings) -> Self {
        let metadata = Arc::new(JobMetadata {
            job_id: context.job_id.clone(),
            execution_id: context.execution_id.clone(),
            crawler: context.crawler,
            source_name: context.source_name,
            source_url: context.source_url,
            verbosity: settings.verbosity,
            started_at: Utc::now(),
            config: ConfigSnapshot {
                throttle_enabled: settings.throttle_enabled(),
                max_logs_per_sec: settings.max_logs_per_sec,
                archive_enabled: settings.archive_enabled,
                replay_buffer_size: settings.replay_window(),
            },
        });

        let metrics = Arc::new(MetricsAccumulator::new());
        let throttle = settings
            .throttle_enabled()
            .then(|| Mutex::new(TokenBucket::new(settings.max_logs_per_sec)));

        Self {
            inner: Arc::new(EngineInner {
                job_id: context.job_id,
                execution_id: context.execution_id,
                metadata: Arc::clone(&metadata),
                emit: Mutex::new(EmitState {
                    ring: RingBuffer::new(settings.buffer_size),
                    last_ts: metadata.started_at,
                }),
                broker: Broker::new(Arc::clone(&metrics)),
                metrics,
                throttle,
                regular_accepted: AtomicU64::new(0),
                truncated: AtomicBool::new(false),
                terminal_emitted: AtomicBool::new(false),
                throttle_report_at: Mutex::new(None),
                started: Instant::now(),
                closed: AtomicBool::new(false),
                archived: Mutex::new(None),
                settings,
            }),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.inner.job_id
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.inner.execution_id
    }

    pub fn metadata(&self) -> &JobMetadata {
        &self.inner.metadata
    }

    pub fn settings(&self) -> &LogSettings {
        &self.inner.settings
    }

    pub fn metrics(&self) -> &MetricsAccumulator {
        &self.inner.metrics
    }

    pub fn verbosity(&self) -> Verbosity {
        self.inner.settings.verbosity
    }

    /// Milliseconds since the engine was created.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.inner.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The archive notice, once the lifecycle controller has finished.
    pub fn archived_notice(&self) -> Option<ArchiveNotice> {
        self.inner.archived.lock().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broker.subscriber_count()
    }

    /// Last `n` buffered records in chronological order (tail endpoint).
    pub fn read_last(&self, n: usize) -> Vec<Arc<LogRecord>> {
        let emit = self.inner.emit.lock();
        emit.ring.read_last(n.min(emit.ring.capacity()))
    }

    pub fn total_inserted(&self) -> u64 {
        self.inner.emit.lock().ring.total_inserted()
    }

    /// Lifecycle shortcut emitted by the scheduler when the crawl begins.
    pub fn job_started(&self, source_id: &str, source_url: &str) {
        self.emit_unchecked(
            LogLevel::Info,
            Category::Lifecycle,
            "Job started",
            fields! { "source_id" => source_id, "source_url" => source_url },
        );
    }

    /// Emit the `Job completed` terminal record with the current summary.
    ///
    /// Usually invoked through [`crate::JobScope::complete`], which also
    /// flushes and archives. Returns false if a terminal record was
    /// already emitted.
    pub fn job_completed(&self) -> bool {
        self.emit_terminal(None)
    }

    /// Emit the `Job failed` terminal record; `error` lands on it.
    ///
    /// Usually invoked through [`crate::JobScope::fail`].
    pub fn job_failed(&self, error: impl std::fmt::Display) -> bool {
        self.emit_terminal(Some(error.to_string()))
    }

    /// Wait for in-flight publishes to drain.
    ///
    /// Publishes complete under the emit lock, so taking it once is the
    /// drain barrier.
    pub fn flush(&self) {
        drop(self.inner.emit.lock());
    }

    /// Subscribe with default options (settings-derived depth and policy).
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with(self.default_subscriber_options())
    }

    /// Subscribe with an event filter on top of the default options.
    pub fn subscribe_filtered(&self, filter: crate::broker::EventFilter) -> Subscription {
        let mut options = self.default_subscriber_options();
        options.filter = Some(filter);
        self.subscribe_with(options)
    }

    fn default_subscriber_options(&self) -> SubscriberOptions {
        SubscriberOptions {
            filter: None,
            channel_depth: self.inner.settings.subscriber_channel_depth,
            policy: self.inner.settings.slow_subscriber_policy,
        }
    }

    /// Register a subscriber and compose its handshake.
    ///
    /// While live: `connected` → `metadata` → `replay` (ring tail, taken
    /// together with the high-water mark under the publish lock so live
    /// lines neither repeat nor skip replayed records). After teardown:
    /// `connected` → `metadata` → `archived`, then the stream closes.
    pub fn subscribe_with(&self, options: SubscriberOptions) -> Subscription {
        let inner = &self.inner;
        let connected = StreamEvent::Connected {
            job_id: inner.job_id.clone(),
            execution_id: inner.execution_id.clone(),
        };
        let metadata = StreamEvent::Metadata(Arc::clone(&inner.metadata));

        if inner.closed.load(Ordering::Acquire) {
            let mut intro = vec![connected, metadata];
            if let Some(notice) = inner.archived.lock().clone() {
                intro.push(StreamEvent::Archived(notice));
            }
            let subscription = inner.broker.subscribe(options, u64::MAX, intro);
            subscription.cancel();
            return subscription;
        }

        let emit = inner.emit.lock();
        let lines = emit.ring.read_last(inner.settings.replay_window());
        let high_water = emit.ring.total_inserted();
        let mut intro = vec![connected, metadata];
        if !lines.is_empty() {
            intro.push(StreamEvent::Replay { lines });
        }
        inner.broker.subscribe(options, high_water, intro)
    }

    pub fn downgrade(&self) -> WeakLogEngine {
        WeakLogEngine(Arc::downgrade(&self.inner))
    }

    // --- admission pipeline ---------------------------------------------

    pub(crate) fn emit_with_scope(
        &self,
        scoped: &[(String, FieldValue)],
        level: LogLevel,
        category: Category,
        message: &str,
        fields: Fields,
    ) {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return;
        }

        // 1. Verbosity gate: cheapest check first, no allocation yet.
        if !inner.settings.verbosity.allows(level) {
            inner.metrics.inc_dropped_gate();
            return;
        }

        // 2. Hard cap fast path.
        if inner.regular_accepted.load(Ordering::Relaxed) >= inner.settings.max_per_job {
            inner.metrics.inc_dropped_cap();
            self.emit_truncated_once();
            return;
        }

        // 3. Field merge; call-site wins on duplicate keys.
        let merged = merge_fields(scoped, fields);

        // 4. Throttle, debug records only.
        if level == LogLevel::Debug {
            if let Some(bucket) = &inner.throttle {
                if !bucket.lock().admit() {
                    let throttled = inner.metrics.inc_throttled();
                    self.maybe_report_throttle(throttled);
                    return;
                }
            }
        }

        // Authoritative cap claim; concurrent emitters race the fast path.
        let claimed = inner.regular_accepted.fetch_add(1, Ordering::AcqRel);
        if claimed >= inner.settings.max_per_job {
            inner.regular_accepted.fetch_sub(1, Ordering::AcqRel);
            inner.metrics.inc_dropped_cap();
            self.emit_truncated_once();
            return;
        }

        // 5–7. Build, publish, count.
        self.publish_record(level, category, message, merged);
    }

    /// Cap-, gate-, and throttle-bypassing emit for lifecycle records.
    pub(crate) fn emit_unchecked(
        &self,
        level: LogLevel,
        category: Category,
        message: &str,
        fields: Fields,
    ) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        self.publish_record(level, category, message, merge_fields(&[], fields));
    }

    fn publish_record(
        &self,
        level: LogLevel,
        category: Category,
        message: &str,
        fields: IndexMap<String, FieldValue>,
    ) {
        let inner = &self.inner;
        let record = {
            let mut emit = inner.emit.lock();
            let timestamp = next_timestamp(&mut emit);
            let record = Arc::new(LogRecord::new(
                timestamp,
                level,
                category,
                message,
                inner.job_id.clone(),
                inner.execution_id.clone(),
                fields,
            ));
            emit.ring.push(Arc::clone(&record));
            let seq = emit.ring.total_inserted();
            inner.broker.publish(&StreamEvent::Line {
                seq,
                record: Arc::clone(&record),
            });
            record
        };

        if inner.settings.also_stdout {
            match serde_json::to_string(&record.fields) {
                Ok(fields_json) => mirror_to_tracing(&record, &fields_json),
                Err(e) => {
                    inner.metrics.inc_internal_error();
                    tracing::warn!(error = %e, "failed to mirror record fields");
                }
            }
        }
        inner.metrics.observe(&record);
    }

    fn emit_truncated_once(&self) {
        let inner = &self.inner;
        if inner
            .truncated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if inner.closed.load(Ordering::Acquire) {
            return;
        }

        let limit = inner.settings.max_per_job;
        let mut emit = inner.emit.lock();
        let timestamp = next_timestamp(&mut emit);
        let record = Arc::new(LogRecord::new(
            timestamp,
            LogLevel::Warn,
            Category::Lifecycle,
            "Log limit reached",
            inner.job_id.clone(),
            inner.execution_id.clone(),
            merge_fields(&[], fields! { "limit" => limit }),
        ));
        emit.ring.push(record);
        inner.broker.publish(&StreamEvent::Truncated {
            job_id: inner.job_id.clone(),
            execution_id: inner.execution_id.clone(),
            limit,
        });
    }

    fn maybe_report_throttle(&self, throttled_total: u64) {
        let inner = &self.inner;
        let now = Instant::now();
        {
            let mut last = inner.throttle_report_at.lock();
            let due = last.is_none_or(|at| now.duration_since(at) >= THROTTLE_REPORT_INTERVAL);
            if !due {
                return;
            }
            *last = Some(now);
        }

        self.emit_unchecked(
            LogLevel::Warn,
            Category::Metrics,
            "Log rate limit active",
            fields! { "logs_throttled" => throttled_total },
        );
    }

    // --- lifecycle hooks (called by JobScope) ---------------------------

    /// Emit the terminal record, exactly once per engine.
    ///
    /// Returns false if a terminal record was already emitted.
    pub(crate) fn emit_terminal(&self, error: Option<String>) -> bool {
        let inner = &self.inner;
        if inner
            .terminal_emitted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let summary = inner.metrics.build_summary(self.elapsed_ms());
        let mut fields = summary.into_fields();
        let (level, message) = match error {
            Some(err) => {
                fields.push(("error".to_string(), FieldValue::from(err)));
                (LogLevel::Error, "Job failed")
            }
            None => (LogLevel::Info, "Job completed"),
        };
        self.emit_unchecked(level, Category::Lifecycle, message, fields);
        true
    }

    /// Ring contents plus the count of records evicted before archival.
    pub(crate) fn snapshot_for_archive(&self) -> (Vec<Arc<LogRecord>>, u64) {
        let emit = self.inner.emit.lock();
        let records = emit.ring.read_all();
        let prefix = emit.ring.total_inserted() - records.len() as u64;
        (records, prefix)
    }

    pub(crate) fn emit_archive_failed(&self, error: &dyn std::fmt::Display) {
        self.emit_unchecked(
            LogLevel::Error,
            Category::Error,
            "Archive failed",
            fields! { "error_kind" => "archive_failed", "error" => error.to_string() },
        );
    }

    /// Record the archive outcome, notify subscribers, and tear down.
    pub(crate) fn finish_archived(&self, notice: ArchiveNotice) {
        let inner = &self.inner;
        *inner.archived.lock() = Some(notice.clone());
        inner.closed.store(true, Ordering::Release);
        // Hold the emit lock so no in-flight record lands after the
        // archived event on any subscriber's stream.
        let _emit = inner.emit.lock();
        inner.broker.publish(&StreamEvent::Archived(notice));
        inner.broker.close();
    }
}

impl LogSink for LogEngine {
    fn emit(&self, level: LogLevel, category: Category, message: &str, fields: Fields) {
        self.emit_with_scope(&[], level, category, message, fields);
    }

    fn is_debug_enabled(&self) -> bool {
        self.inner.settings.verbosity.debug_enabled()
    }

    fn with_fields(&self, fields: Fields) -> ScopedLogger {
        ScopedLogger {
            engine: self.clone(),
            scoped: Arc::new(fields),
        }
    }
}

/// Engine view carrying pre-set fields, created per-URL or per-page.
/// Composable: `with_fields` on a scoped logger appends.
#[derive(Clone)]
pub struct ScopedLogger {
    engine: LogEngine,
    scoped: Arc<Fields>,
}

impl ScopedLogger {
    pub fn engine(&self) -> &LogEngine {
        &self.engine
    }

    pub fn scoped_fields(&self) -> &[(String, FieldValue)] {
        &self.scoped
    }
}

impl LogSink for ScopedLogger {
    fn emit(&self, level: LogLevel, category: Category, message: &str, fields: Fields) {
        self.engine
            .emit_with_scope(&self.scoped, level, category, message, fields);
    }

    fn is_debug_enabled(&self) -> bool {
        self.engine.is_debug_enabled()
    }

    fn with_fields(&self, fields: Fields) -> ScopedLogger {
        let mut combined = Fields::with_capacity(self.scoped.len() + fields.len());
        combined.extend(self.scoped.iter().cloned());
        combined.extend(fields);
        ScopedLogger {
            engine: self.engine.clone(),
            scoped: Arc::new(combined),
        }
    }
}

/// Weak engine handle held by the process-scope registry.
#[derive(Clone)]
pub struct WeakLogEngine(Weak<EngineInner>);

impl WeakLogEngine {
    pub fn upgrade(&self) -> Option<LogEngine> {
        self.0.upgrade().map(|inner| LogEngine { inner })
    }
}

/// Monotonic timestamp acquisition; ties broken by insertion order under
/// the emit lock.
fn next_timestamp(emit: &mut EmitState) -> DateTime<Utc> {
    let mut now = Utc::now();
    if now < emit.last_ts {
        now = emit.last_ts;
    }
    emit.last_ts = now;
    now
}

fn mirror_to_tracing(record: &LogRecord, fields: &str) {
    match record.level {
        LogLevel::Debug => tracing::debug!(
            target: "crawld::job",
            job_id = %record.job_id,
            execution_id = %record.execution_id,
            category = %record.category,
            fields = %fields,
            "{}", record.message
        ),
        LogLevel::Info => tracing::info!(
            target: "crawld::job",
            job_id = %record.job_id,
            execution_id = %record.execution_id,
            category = %record.category,
            fields = %fields,
            "{}", record.message
        ),
        LogLevel::Warn => tracing::warn!(
            target: "crawld::job",
            job_id = %record.job_id,
            execution_id = %record.execution_id,
            category = %record.category,
            fields = %fields,
            "{}", record.message
        ),
        LogLevel::Error => tracing::error!(
            target: "crawld::job",
            job_id = %record.job_id,
            execution_id = %record.execution_id,
            category = %record.category,
            fields = %fields,
            "{}", record.message
        ),
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
