// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handler state.

use crawld_engine::EngineRegistry;
use crawld_storage::ObjectStore;
use std::sync::Arc;

/// State threaded through every handler: the process-scope engine
/// registry and the archival object store.
#[derive(Clone)]
pub struct AppState {
    pub registry: EngineRegistry,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(registry: EngineRegistry, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }
}
