//! Write path
//!
//! Writes go to a local staging file. A commit task, spawned when the write
//! is opened, waits for the writer to hand the sealed staging file over a
//! oneshot channel, uploads it, and removes it.
//!
//! Under [`CommitPolicy::Background`] the writer's close returns as soon as
//! the local file is flushed, so a commit failure is only logged. Callers
//! that need durability either use [`CommitPolicy::WaitOnClose`] or call
//! [`Committer::flush`] before exiting.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch};
use tokio_util::task::TaskTracker;

use crate::address::BlobAddress;
use crate::backend::{BackendHandle, BlobStore};
use crate::error::{Error, Result};
use crate::staging::StagingFile;

/// When a writer's close returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Close returns after the local flush; the commit runs in the background
    #[default]
    Background,
    /// Close waits for the commit and reports its failure
    #[serde(rename = "wait")]
    WaitOnClose,
}

/// Terminal state of one write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Failed,
    /// The writer was dropped without being closed
    Abandoned,
}

/// Snapshot of commit task counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub committed: u64,
    pub failed: u64,
    pub abandoned: u64,
    /// Commit tasks not yet finished, including those whose writer is still open
    pub pending: u64,
}

#[derive(Debug, Default)]
struct Counters {
    committed: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: CommitOutcome) {
        let counter = match outcome {
            CommitOutcome::Committed => &self.committed,
            CommitOutcome::Failed => &self.failed,
            CommitOutcome::Abandoned => &self.abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Commit tasks that have not finished yet, by spawn sequence number
#[derive(Debug, Default)]
struct PendingCommits {
    next: u64,
    ids: BTreeSet<u64>,
}

/// Removes its task from the pending set when the task ends or is dropped
struct PendingGuard {
    id: u64,
    pending: Arc<watch::Sender<PendingCommits>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.send_modify(|pending| {
            pending.ids.remove(&self.id);
        });
    }
}

/// Schedules commit tasks on the tokio worker pool and tracks them
#[derive(Debug, Clone)]
pub struct Committer {
    tracker: TaskTracker,
    policy: CommitPolicy,
    staging_root: Option<PathBuf>,
    counters: Arc<Counters>,
    pending: Arc<watch::Sender<PendingCommits>>,
}

impl Default for Committer {
    fn default() -> Self {
        Self::new(CommitPolicy::default())
    }
}

impl Committer {
    pub fn new(policy: CommitPolicy) -> Self {
        Self {
            tracker: TaskTracker::new(),
            policy,
            staging_root: None,
            counters: Arc::new(Counters::default()),
            pending: Arc::new(watch::channel(PendingCommits::default()).0),
        }
    }

    /// Stage writes under `root` instead of the system temp dir
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    pub fn staging_root(&self) -> Option<&Path> {
        self.staging_root.as_deref()
    }

    pub fn stats(&self) -> CommitStats {
        CommitStats {
            committed: self.counters.committed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
            pending: self.pending.borrow().ids.len() as u64,
        }
    }

    /// Wait for every commit task spawned so far
    ///
    /// Tasks whose writer is still open are waited for too; tasks spawned
    /// after the call starts are not. With a timeout, returns
    /// [`Error::Timeout`] if tasks remain when it elapses.
    pub async fn flush(&self, timeout: Option<Duration>) -> Result<()> {
        let horizon = self.pending.borrow().next;
        let mut pending = self.pending.subscribe();
        let settled = async move {
            // The sender outlives this call, so this only returns once settled.
            let _ = pending
                .wait_for(|p| p.ids.first().is_none_or(|id| *id >= horizon))
                .await;
        };

        match timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, settled).await.is_err() {
                    let remaining = self.pending.borrow().ids.range(..horizon).count();
                    return Err(Error::Timeout(format!(
                        "{remaining} blob commit(s) still pending"
                    )));
                }
            }
            None => settled.await,
        }
        Ok(())
    }

    fn track(&self) -> PendingGuard {
        let mut id = 0;
        self.pending.send_modify(|pending| {
            id = pending.next;
            pending.next += 1;
            pending.ids.insert(id);
        });
        PendingGuard {
            id,
            pending: self.pending.clone(),
        }
    }
}

/// Byte sink for one blob write
///
/// Implements [`AsyncWrite`]; `shutdown` seals the write like
/// [`close`](Self::close) does. Dropping an unclosed writer discards
/// the staged data.
#[derive(Debug)]
pub struct BlobWriter {
    target: String,
    file: Option<tokio::fs::File>,
    staging: Option<StagingFile>,
    gate: Option<oneshot::Sender<StagingFile>>,
    outcome: Option<oneshot::Receiver<Result<()>>>,
    staging_dir: PathBuf,
    bytes_written: u64,
}

impl BlobWriter {
    /// Seal the write
    ///
    /// Flushes and closes the local file and hands it to the commit task.
    /// Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        self.shutdown().await?;
        match self.outcome.take() {
            Some(outcome) => outcome.await.unwrap_or_else(|_| {
                Err(Error::CommitFailure {
                    target: self.target.clone(),
                    reason: "commit task ended without reporting".into(),
                })
            }),
            None => Ok(()),
        }
    }

    /// Whether the write has been sealed
    pub fn is_closed(&self) -> bool {
        self.staging.is_none()
    }

    /// Bytes accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Directory holding this write's staging file
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// `selector/container/key` this writer commits to
    pub fn target(&self) -> &str {
        &self.target
    }

    fn seal(&mut self) {
        let (Some(gate), Some(staging)) = (self.gate.take(), self.staging.take()) else {
            return;
        };
        if let Err(staging) = gate.send(staging) {
            tracing::warn!(blob = %self.target, "Commit task is gone, discarding staged data");
            staging.cleanup();
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "blob writer is closed")
}

impl AsyncWrite for BlobWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(file) = this.file.as_mut() else {
            return Poll::Ready(Err(closed_error()));
        };
        let written = ready!(Pin::new(file).poll_write(cx, buf))?;
        this.bytes_written += written as u64;
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(file) = this.file.as_mut() {
            ready!(Pin::new(file).poll_flush(cx))?;
            this.file = None;
        }
        this.seal();
        Poll::Ready(Ok(()))
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if let Some(staging) = self.staging.take() {
            self.file = None;
            self.gate = None;
            tracing::warn!(
                blob = %self.target,
                bytes = self.bytes_written,
                "Blob writer dropped without close, discarding staged data"
            );
            staging.cleanup();
        }
    }
}

/// Open a staged write to the addressed blob
///
/// Creates the container if needed, then the staging file, and spawns the
/// commit task before returning.
pub async fn open_write(
    handle: BackendHandle,
    address: &BlobAddress,
    committer: &Committer,
) -> Result<BlobWriter> {
    ensure_container(handle.as_ref(), &address.container).await?;

    let (staging, file) = StagingFile::create(committer.staging_root())?;
    let staging_dir = staging.dir().to_path_buf();
    let target = address.to_string();

    let (gate_tx, gate_rx) = oneshot::channel();
    let (outcome_tx, outcome_rx) = match committer.policy {
        CommitPolicy::WaitOnClose => {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        }
        CommitPolicy::Background => (None, None),
    };

    let task = CommitTask {
        handle,
        container: address.container.clone(),
        key: address.key.clone(),
        target: target.clone(),
        counters: committer.counters.clone(),
    };
    let guard = committer.track();
    committer.tracker.spawn(async move {
        task.run(gate_rx, outcome_tx).await;
        drop(guard);
    });

    tracing::debug!(blob = %target, staging = %staging_dir.display(), "Opened staged blob write");

    Ok(BlobWriter {
        target,
        file: Some(tokio::fs::File::from_std(file)),
        staging: Some(staging),
        gate: Some(gate_tx),
        outcome: outcome_rx,
        staging_dir,
        bytes_written: 0,
    })
}

async fn ensure_container(handle: &dyn BlobStore, container: &str) -> Result<()> {
    if handle.container_exists(container).await? {
        return Ok(());
    }
    if let Err(e) = handle.create_container(container).await {
        // Another writer may have created it in the meantime.
        if handle.container_exists(container).await.unwrap_or(false) {
            return Ok(());
        }
        return Err(e);
    }
    Ok(())
}

struct CommitTask {
    handle: BackendHandle,
    container: String,
    key: String,
    target: String,
    counters: Arc<Counters>,
}

impl CommitTask {
    async fn run(
        self,
        gate: oneshot::Receiver<StagingFile>,
        outcome_tx: Option<oneshot::Sender<Result<()>>>,
    ) {
        let Ok(staging) = gate.await else {
            // The writer already removed its staging file.
            self.counters.record(CommitOutcome::Abandoned);
            return;
        };

        let result = self
            .handle
            .commit_write(&self.container, &self.key, staging.path())
            .await
            .map_err(|e| Error::CommitFailure {
                target: self.target.clone(),
                reason: e.to_string(),
            });

        staging.cleanup();

        match &result {
            Ok(()) => {
                tracing::info!(blob = %self.target, "Committed blob");
                self.counters.record(CommitOutcome::Committed);
            }
            Err(e) => {
                tracing::error!(blob = %self.target, error = %e, "Blob commit failed");
                self.counters.record(CommitOutcome::Failed);
            }
        }

        if let Some(tx) = outcome_tx {
            let _ = tx.send(result);
        }
    }
}
