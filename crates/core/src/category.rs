// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log record categories.
//!
//! The closed set drives metric roll-ups and UI filtering. Records carrying
//! a category outside the set are accepted but contribute to no roll-up.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier for log records, serialized as the dotted wire name
/// (`crawler.fetch`, `crawler.error`, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Lifecycle,
    Fetch,
    Extract,
    Error,
    RateLimit,
    Queue,
    Metrics,
    /// Any category outside the closed set; carried through verbatim.
    Other(String),
}

impl Category {
    /// The dotted wire name for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Lifecycle => "crawler.lifecycle",
            Category::Fetch => "crawler.fetch",
            Category::Extract => "crawler.extract",
            Category::Error => "crawler.error",
            Category::RateLimit => "crawler.rate_limit",
            Category::Queue => "crawler.queue",
            Category::Metrics => "crawler.metrics",
            Category::Other(name) => name,
        }
    }

    /// Whether this category is in the closed set.
    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        match name {
            "crawler.lifecycle" => Category::Lifecycle,
            "crawler.fetch" => Category::Fetch,
            "crawler.extract" => Category::Extract,
            "crawler.error" => Category::Error,
            "crawler.rate_limit" => Category::RateLimit,
            "crawler.queue" => Category::Queue,
            "crawler.metrics" => Category::Metrics,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Category::from(name.as_str()))
    }
}

#[cfg(test)]
#[path = "category_tests.rs"]
mod tests;
