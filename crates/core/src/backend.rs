//! Backend trait definitions
//!
//! `BlobStore` is the handle the read and write paths talk to. The two
//! collaborator traits, `BackendLookup` and `BackendFactory`, are the only
//! way the core finds or builds such handles.

use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};

/// Live byte stream returned by a backend read
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Shared handle to a live backend instance
pub type BackendHandle = Arc<dyn BlobStore>;

/// Trait for blob storage backends
///
/// Implementations must be safe to use from several read and write paths
/// at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if a container exists
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// Create a container
    async fn create_container(&self, container: &str) -> Result<()>;

    /// Check if a blob exists
    async fn blob_exists(&self, container: &str, key: &str) -> Result<bool>;

    /// Open a streaming read of a blob
    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader>;

    /// Store the contents of a local file as a blob
    async fn commit_write(&self, container: &str, key: &str, source: &Path) -> Result<()>;
}

/// Finds already-registered backend instances
#[async_trait]
pub trait BackendLookup: Send + Sync {
    /// Find an instance by id when `instance_id` is set, otherwise by selector
    async fn find_backend(&self, instance_id: Option<&str>, selector: &str)
    -> Option<BackendHandle>;
}

/// Builds backend handles from inline credentials
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Construct a new, unregistered handle
    async fn create_backend(
        &self,
        selector: &str,
        identity: &str,
        secret: &str,
    ) -> Result<BackendHandle>;
}

/// Factories keyed by backend selector
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a selector, replacing any previous one
    pub fn register(&mut self, selector: impl Into<String>, factory: Arc<dyn BackendFactory>) {
        self.factories.insert(selector.into(), factory);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, selector: impl Into<String>, factory: Arc<dyn BackendFactory>) -> Self {
        self.register(selector, factory);
        self
    }

    /// Whether a factory is registered for the selector
    pub fn supports(&self, selector: &str) -> bool {
        self.factories.contains_key(selector)
    }

    /// Registered selectors, sorted
    pub fn selectors(&self) -> Vec<&str> {
        let mut selectors: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        selectors.sort_unstable();
        selectors
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("selectors", &self.selectors())
            .finish()
    }
}

#[async_trait]
impl BackendFactory for FactoryRegistry {
    async fn create_backend(
        &self,
        selector: &str,
        identity: &str,
        secret: &str,
    ) -> Result<BackendHandle> {
        let factory = self.factories.get(selector).ok_or_else(|| {
            Error::BackendUnavailable(format!(
                "no backend factory for provider '{selector}' (known: {})",
                self.selectors().join(", ")
            ))
        })?;
        factory.create_backend(selector, identity, secret).await
    }
}
