// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-message normalization for the top-errors roll-up.
//!
//! Normalized messages identify "the same error" across differing URLs,
//! ids, and counts: `connection refused for https://a/x (attempt 3)` and
//! `connection refused for https://b/y (attempt 7)` collapse to one key.

use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| compile(r#"https?://[^\s"'<>]+"#));
static HEX_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"\b[0-9a-f]{16,}\b"));
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"[0-9]+"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));

#[allow(clippy::unwrap_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// Normalize an error message into a stable roll-up key.
///
/// Lowercases, then replaces URLs with `<url>`, hex runs of 16+ with
/// `<hex>`, and digit runs with `N`; whitespace collapses to single
/// spaces. Idempotent: applying it twice yields the same key.
pub fn normalize_error(message: &str) -> String {
    // 'N' is the digit placeholder; folding it to lowercase would break
    // idempotence, so it is exempt from the case fold.
    let lower: String = message
        .chars()
        .map(|c| if c == 'N' { 'N' } else { c.to_ascii_lowercase() })
        .collect();

    let s = URL_RE.replace_all(&lower, "<url>");
    let s = HEX_RE.replace_all(&s, "<hex>");
    let s = DIGITS_RE.replace_all(&s, "N");
    let s = WS_RE.replace_all(&s, " ");
    s.trim().to_string()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
