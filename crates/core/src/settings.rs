// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution engine settings.
//!
//! Settings arrive from the orchestrator's configuration layer already
//! parsed; every field has a default so partial configs deserialize.
//! Environment overrides use the `CRAWLD_LOG_` prefix.

use crate::verbosity::Verbosity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the broker does when a subscriber's outgoing queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowSubscriberPolicy {
    /// Evict the subscriber and close its queue.
    #[default]
    Disconnect,
    /// Pop the oldest pending event and retry the push once.
    DropOldest,
}

/// Engine configuration, immutable for the lifetime of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Level gate for regular records.
    pub verbosity: Verbosity,
    /// Token-bucket rate for `debug` records; 0 disables throttling.
    pub max_logs_per_sec: u32,
    /// W — records returned in the `replay` batch (≤ `buffer_size`).
    pub replay_buffer_size: usize,
    /// C — ring capacity.
    pub buffer_size: usize,
    /// M — hard cap on regular records per execution.
    pub max_per_job: u64,
    /// Heartbeat interval, in seconds on the wire.
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,
    /// When false the archiver is a no-op; `archived` still fires with a
    /// null object key.
    pub archive_enabled: bool,
    /// Mirror accepted records to the process `tracing` sink.
    pub also_stdout: bool,
    /// Per-subscriber outgoing queue depth.
    pub subscriber_channel_depth: usize,
    pub slow_subscriber_policy: SlowSubscriberPolicy,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            max_logs_per_sec: 50,
            replay_buffer_size: 200,
            buffer_size: 1000,
            max_per_job: 50_000,
            heartbeat_interval: Duration::from_secs(15),
            archive_enabled: true,
            also_stdout: false,
            subscriber_channel_depth: 64,
            slow_subscriber_policy: SlowSubscriberPolicy::Disconnect,
        }
    }
}

impl LogSettings {
    /// Defaults with `CRAWLD_LOG_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings
    }

    /// Apply overrides from a name → value lookup (the env in production).
    /// Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CRAWLD_LOG_VERBOSITY").and_then(|s| s.parse().ok()) {
            self.verbosity = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_MAX_LOGS_PER_SEC").and_then(|s| s.parse().ok()) {
            self.max_logs_per_sec = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_REPLAY_BUFFER_SIZE").and_then(|s| s.parse().ok()) {
            self.replay_buffer_size = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_BUFFER_SIZE").and_then(|s| s.parse().ok()) {
            self.buffer_size = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_MAX_PER_JOB").and_then(|s| s.parse().ok()) {
            self.max_per_job = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_HEARTBEAT_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.heartbeat_interval = Duration::from_secs(v);
        }
        if let Some(v) = lookup("CRAWLD_LOG_ARCHIVE_ENABLED").and_then(|s| parse_bool(&s)) {
            self.archive_enabled = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_ALSO_STDOUT").and_then(|s| parse_bool(&s)) {
            self.also_stdout = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_CHANNEL_DEPTH").and_then(|s| s.parse().ok()) {
            self.subscriber_channel_depth = v;
        }
        if let Some(v) = lookup("CRAWLD_LOG_SLOW_SUBSCRIBER_POLICY") {
            match v.as_str() {
                "disconnect" => self.slow_subscriber_policy = SlowSubscriberPolicy::Disconnect,
                "drop_oldest" => self.slow_subscriber_policy = SlowSubscriberPolicy::DropOldest,
                _ => {}
            }
        }
    }

    /// Whether the debug-record throttle is active.
    pub fn throttle_enabled(&self) -> bool {
        self.max_logs_per_sec > 0
    }

    /// Replay window, clamped to the ring capacity.
    pub fn replay_window(&self) -> usize {
        self.replay_buffer_size.min(self.buffer_size)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
