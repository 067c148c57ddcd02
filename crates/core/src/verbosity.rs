// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verbosity gate: `quiet` < `normal` < `debug` (= `trace`).

use crate::record::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global emission gate for regular (non-lifecycle) records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only `warn` and `error` records pass.
    Quiet,
    /// `info` and above pass.
    #[default]
    Normal,
    /// All levels pass.
    Debug,
    /// Alias of `debug`; no observable difference.
    Trace,
}

impl Verbosity {
    /// Whether a record at `level` passes this gate.
    ///
    /// Lifecycle records bypass the gate entirely; that exemption lives in
    /// the engine, not here.
    pub fn allows(self, level: LogLevel) -> bool {
        match self {
            Verbosity::Quiet => level >= LogLevel::Warn,
            Verbosity::Normal => level >= LogLevel::Info,
            Verbosity::Debug | Verbosity::Trace => true,
        }
    }

    /// Whether `debug` records pass the gate.
    pub fn debug_enabled(self) -> bool {
        matches!(self, Verbosity::Debug | Verbosity::Trace)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = UnknownVerbosity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "debug" => Ok(Verbosity::Debug),
            "trace" => Ok(Verbosity::Trace),
            other => Err(UnknownVerbosity(other.to_string())),
        }
    }
}

/// Error for unrecognized verbosity names.
#[derive(Debug, thiserror::Error)]
#[error("unknown verbosity: {0}")]
pub struct UnknownVerbosity(pub String);

#[cfg(test)]
#[path = "verbosity_tests.rs"]
mod tests;
