// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiter for `debug` records.

use std::time::Instant;

/// Classic token bucket: capacity equals the per-second rate, starts full,
/// refills continuously. One token is consumed per admitted record.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Bucket admitting `rate_per_sec` records per second. Callers disable
    /// throttling by not constructing a bucket at all, so `rate_per_sec`
    /// is expected to be non-zero.
    pub fn new(rate_per_sec: u32) -> Self {
        let rate = f64::from(rate_per_sec.max(1));
        Self {
            rate,
            tokens: rate,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume one token.
    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    /// Clock-injected variant of [`admit`](Self::admit) for tests.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.rate).min(self.rate);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "throttle_tests.rs"]
mod tests;
