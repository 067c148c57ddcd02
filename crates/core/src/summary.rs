// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate execution statistics emitted with the terminal record.

use crate::field::{FieldValue, Fields};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the top-errors roll-up: a normalized message, how often it
/// was seen, and the last URL it was seen on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopError {
    pub message: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_url: Option<String>,
}

/// Counters aggregated over one execution, attached as the fields of the
/// terminal `Job completed` / `Job failed` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub pages_discovered: u64,
    pub pages_crawled: u64,
    pub items_extracted: u64,
    pub errors_count: u64,
    pub duration_ms: u64,
    pub bytes_fetched: u64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_errors: Vec<TopError>,
    pub logs_emitted: u64,
    pub logs_throttled: u64,
    pub throttle_percent: f64,
}

impl JobSummary {
    /// Flatten the summary into record fields.
    ///
    /// The status-code histogram becomes a nested map keyed by the decimal
    /// code; top errors become an array of maps.
    pub fn into_fields(self) -> Fields {
        let mut fields: Fields = vec![
            ("pages_discovered".to_string(), self.pages_discovered.into()),
            ("pages_crawled".to_string(), self.pages_crawled.into()),
            ("items_extracted".to_string(), self.items_extracted.into()),
            ("errors_count".to_string(), self.errors_count.into()),
            ("duration_ms".to_string(), self.duration_ms.into()),
            ("bytes_fetched".to_string(), self.bytes_fetched.into()),
            ("total_requests".to_string(), self.total_requests.into()),
            ("failed_requests".to_string(), self.failed_requests.into()),
        ];

        let mut codes = IndexMap::new();
        for (code, count) in self.status_codes {
            codes.insert(code.to_string(), FieldValue::from(count));
        }
        fields.push(("status_codes".to_string(), FieldValue::Map(codes)));

        let top = self
            .top_errors
            .into_iter()
            .map(|e| {
                let mut entry = IndexMap::new();
                entry.insert("message".to_string(), FieldValue::from(e.message));
                entry.insert("count".to_string(), FieldValue::from(e.count));
                if let Some(url) = e.last_url {
                    entry.insert("last_url".to_string(), FieldValue::from(url));
                }
                FieldValue::Map(entry)
            })
            .collect::<Vec<_>>();
        fields.push(("top_errors".to_string(), FieldValue::Array(top)));

        fields.push(("logs_emitted".to_string(), self.logs_emitted.into()));
        fields.push(("logs_throttled".to_string(), self.logs_throttled.into()));
        fields.push(("throttle_percent".to_string(), self.throttle_percent.into()));
        fields
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
