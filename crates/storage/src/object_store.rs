// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store abstraction over the archival backend.
//!
//! The pipeline treats the store as an opaque blob sink. Production deploys
//! wire a cloud-backed implementation; the filesystem store serves
//! single-host deployments and the in-memory store serves tests and
//! archive-disabled setups.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from object-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Opaque blob sink keyed by `/`-separated strings.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Read the object at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// List keys under `prefix`, lexicographically sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Filesystem-backed store rooted at a directory; keys map to paths.
///
/// Writes go to a `.tmp` sibling first and are renamed into place, so a
/// crash mid-write never leaves a half-written object.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.ends_with(".tmp") {
                    keys.push(format!("{}{}", prefix, name));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store for tests and archive-disabled deployments.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects.lock().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects.lock().get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Failure-injecting store for tests.
#[cfg(feature = "test-support")]
pub struct FakeObjectStore {
    inner: MemoryObjectStore,
    fail_puts: std::sync::atomic::AtomicBool,
    put_delay: Mutex<Option<std::time::Duration>>,
}

#[cfg(feature = "test-support")]
impl Default for FakeObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "test-support")]
impl FakeObjectStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new(),
            fail_puts: std::sync::atomic::AtomicBool::new(false),
            put_delay: Mutex::new(None),
        }
    }

    /// Make every subsequent `put` fail with [`StoreError::Unavailable`].
    pub fn fail_puts(&self) {
        self.fail_puts.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Delay every subsequent `put` (for upload-timeout tests).
    pub fn delay_puts(&self, delay: std::time::Duration) {
        *self.put_delay.lock() = Some(delay);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(feature = "test-support")]
#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let delay = *self.put_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected put failure".to_string()));
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list(prefix).await
    }
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
