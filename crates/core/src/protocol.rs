//! `blob://` URL access
//!
//! Ties parsing, resolution and the read/write paths together behind the two
//! collaborator traits.

use std::sync::Arc;
use std::time::Duration;

use crate::address::{BlobAddress, parse_address};
use crate::backend::{BackendFactory, BackendLookup, BlobReader, BlobStore};
use crate::error::Result;
use crate::read;
use crate::resolver::{ResolvedBackend, resolve};
use crate::write::{self, BlobWriter, CommitStats, Committer};

/// Entry point for stream access to blob URLs
#[derive(Clone)]
pub struct BlobProtocol {
    lookup: Arc<dyn BackendLookup>,
    factory: Arc<dyn BackendFactory>,
    committer: Committer,
}

impl BlobProtocol {
    pub fn new(
        lookup: Arc<dyn BackendLookup>,
        factory: Arc<dyn BackendFactory>,
        committer: Committer,
    ) -> Self {
        Self {
            lookup,
            factory,
            committer,
        }
    }

    /// Open a streaming read of the blob at `url`
    pub async fn open_read(&self, url: &str) -> Result<BlobReader> {
        let address = parse_address(url)?;
        let backend = self.resolve(&address).await?;
        read::open_read(backend.handle.as_ref(), &address).await
    }

    /// Open a staged write to the blob at `url`
    ///
    /// The commit is scheduled immediately and runs once the writer is closed.
    pub async fn open_write(&self, url: &str) -> Result<BlobWriter> {
        let address = parse_address(url)?;
        let backend = self.resolve(&address).await?;
        write::open_write(backend.handle, &address, &self.committer).await
    }

    /// Whether the blob at `url` exists
    pub async fn blob_exists(&self, url: &str) -> Result<bool> {
        let address = parse_address(url)?;
        let backend = self.resolve(&address).await?;
        let handle = backend.handle.as_ref();
        Ok(handle.container_exists(&address.container).await?
            && handle.blob_exists(&address.container, &address.key).await?)
    }

    /// Wait for pending commits
    pub async fn flush(&self, timeout: Option<Duration>) -> Result<()> {
        self.committer.flush(timeout).await
    }

    pub fn commit_stats(&self) -> CommitStats {
        self.committer.stats()
    }

    pub fn committer(&self) -> &Committer {
        &self.committer
    }

    async fn resolve(&self, address: &BlobAddress) -> Result<ResolvedBackend> {
        let backend = resolve(address, self.lookup.as_ref(), self.factory.as_ref()).await?;
        tracing::debug!(
            address = %address,
            ephemeral = backend.ephemeral,
            "Resolved blob backend"
        );
        Ok(backend)
    }
}

impl std::fmt::Debug for BlobProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobProtocol")
            .field("committer", &self.committer)
            .finish_non_exhaustive()
    }
}
