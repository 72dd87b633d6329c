//! Transient in-memory backend
//!
//! Blobs live only as long as the store. Used for the `transient` provider
//! and throughout the test suite.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{BackendFactory, BackendHandle, BlobReader, BlobStore};
use crate::error::{Error, Result};

/// Selector under which the in-memory backend is registered
pub const TRANSIENT_SELECTOR: &str = "transient";

type Container = BTreeMap<String, Arc<Vec<u8>>>;

/// In-memory blob store
#[derive(Debug, Default)]
pub struct MemoryStore {
    containers: RwLock<HashMap<String, Container>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a blob, if present
    pub async fn get(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .and_then(|c| c.get(key))
            .map(|data| data.as_ref().clone())
    }

    /// Keys stored in a container, sorted
    pub async fn keys(&self, container: &str) -> Vec<String> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.containers.read().await.contains_key(container))
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn blob_exists(&self, container: &str, key: &str) -> Result<bool> {
        let containers = self.containers.read().await;
        Ok(containers
            .get(container)
            .is_some_and(|c| c.contains_key(key)))
    }

    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader> {
        let containers = self.containers.read().await;
        let data = containers
            .get(container)
            .ok_or_else(|| Error::ContainerNotFound(container.to_string()))?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::BlobNotFound(format!("{container}/{key}")))?;

        Ok(Box::pin(Cursor::new(SharedBytes(data))))
    }

    async fn commit_write(&self, container: &str, key: &str, source: &Path) -> Result<()> {
        let data = tokio::fs::read(source).await?;
        let mut containers = self.containers.write().await;
        let entry = containers
            .get_mut(container)
            .ok_or_else(|| Error::ContainerNotFound(container.to_string()))?;
        entry.insert(key.to_string(), Arc::new(data));
        Ok(())
    }
}

/// Reader-side view of a stored blob, so reads never copy the stored bytes
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Builds a fresh, isolated [`MemoryStore`] per call
///
/// Inline credentials are accepted as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryFactory;

#[async_trait]
impl BackendFactory for MemoryFactory {
    async fn create_backend(
        &self,
        _selector: &str,
        _identity: &str,
        _secret: &str,
    ) -> Result<BackendHandle> {
        Ok(Arc::new(MemoryStore::new()))
    }
}
