// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-scope registry of live engines.
//!
//! The HTTP layer resolves `job_id → engine` through this map; nothing
//! else consults it. Entries are weak, so a registry reference never keeps
//! a finished engine alive; dead entries are pruned on lookup.

use crate::logger::{LogEngine, WeakLogEngine};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Weak `job_id → engine` map shared with the HTTP layer.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    inner: Arc<Mutex<HashMap<String, WeakLogEngine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the engine under its job id, replacing any previous
    /// execution's entry.
    pub fn register(&self, engine: &LogEngine) {
        self.inner
            .lock()
            .insert(engine.job_id().to_string(), engine.downgrade());
    }

    /// Resolve a live engine, pruning the entry if it is gone.
    pub fn get(&self, job_id: &str) -> Option<LogEngine> {
        let mut map = self.inner.lock();
        match map.get(job_id).and_then(WeakLogEngine::upgrade) {
            Some(engine) => Some(engine),
            None => {
                map.remove(job_id);
                None
            }
        }
    }

    /// Drop the entry for a job (engine teardown).
    pub fn remove(&self, job_id: &str) {
        self.inner.lock().remove(job_id);
    }

    /// Live entries (dead ones are dropped as a side effect).
    pub fn len(&self) -> usize {
        let mut map = self.inner.lock();
        map.retain(|_, weak| weak.upgrade().is_some());
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
