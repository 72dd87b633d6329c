//! cp command - Copy between local files and blob URLs
//!
//! Supports local → blob, blob → local and blob → blob. Writes to blob URLs
//! are staged and committed in the background; the command waits for every
//! commit before it reports success.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::Args;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Session, TransferOutput, display_url};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copy between local files and blob URLs
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source (local path or blob URL)
    pub source: String,

    /// Destination (local path or blob URL); a trailing '/' keeps the source name
    pub target: String,
}

/// Either side of a copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Blob(String),
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let is_blob = raw
            .split_once(':')
            .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("blob"));
        if is_blob {
            Self::Blob(raw.to_string())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    /// Last path segment, used when the other side names a directory
    fn file_name(&self) -> Option<String> {
        match self {
            Self::Local(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Blob(url) => {
                let path = url.split(['?', ';']).next().unwrap_or(url);
                path.rsplit('/')
                    .next()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            }
        }
    }
}

/// Execute the cp command
pub async fn execute(args: CpArgs, session: &Session) -> ExitCode {
    let source = Location::parse(&args.source);
    let target = Location::parse(&args.target);

    let result = match (&source, &target) {
        (Location::Local(src), Location::Blob(dst)) => upload(src, dst, session).await,
        (Location::Blob(src), Location::Local(dst)) => download(src, dst, session).await,
        (Location::Blob(src), Location::Blob(dst)) => copy_blob(src, dst, session).await,
        (Location::Local(_), Location::Local(_)) => {
            session
                .formatter
                .error("Cannot copy between two local paths. Use system cp command.");
            return ExitCode::UsageError;
        }
    };

    match result {
        Ok(output) => {
            session.formatter.output(&output);
            ExitCode::Success
        }
        Err(e) => session.formatter.fail(&e),
    }
}

async fn upload(src: &Path, dst: &str, session: &Session) -> anyhow::Result<TransferOutput> {
    let metadata = tokio::fs::metadata(src)
        .await
        .with_context(|| format!("Source not found: {}", src.display()))?;
    if metadata.is_dir() {
        bail!("Source is a directory: {}", src.display());
    }

    let dst = blob_target(dst, &Location::Local(src.to_path_buf()))?;
    let mut file = tokio::fs::File::open(src)
        .await
        .with_context(|| format!("Failed to open {}", src.display()))?;
    let mut writer = session.protocol.open_write(&dst).await?;

    let progress = ProgressBar::new(session.formatter.config(), metadata.len());
    let size = copy_with_progress(&mut file, &mut writer, &progress).await;
    progress.finish_and_clear();
    let size = size.with_context(|| format!("Failed to read {}", src.display()))?;

    writer.close().await?;
    session.settle(session.flush_timeout).await?;

    Ok(TransferOutput::new(
        src.display().to_string(),
        display_url(&dst),
        size,
    ))
}

async fn download(src: &str, dst: &Path, session: &Session) -> anyhow::Result<TransferOutput> {
    let dst = if dst.is_dir() {
        let name = Location::Blob(src.to_string())
            .file_name()
            .context("Source URL has no file name")?;
        dst.join(name)
    } else {
        dst.to_path_buf()
    };

    let mut reader = session.protocol.open_read(src).await?;
    let mut file = tokio::fs::File::create(&dst)
        .await
        .with_context(|| format!("Failed to create {}", dst.display()))?;

    let progress = ProgressBar::bytes_spinner(session.formatter.config(), "Downloading");
    let size = copy_with_progress(&mut reader, &mut file, &progress).await;
    progress.finish_and_clear();
    let size = size.with_context(|| format!("Failed to write {}", dst.display()))?;
    file.sync_all().await?;

    Ok(TransferOutput::new(
        display_url(src),
        dst.display().to_string(),
        size,
    ))
}

async fn copy_blob(src: &str, dst: &str, session: &Session) -> anyhow::Result<TransferOutput> {
    let dst = blob_target(dst, &Location::Blob(src.to_string()))?;
    let mut reader = session.protocol.open_read(src).await?;
    let mut writer = session.protocol.open_write(&dst).await?;

    let progress = ProgressBar::bytes_spinner(session.formatter.config(), "Copying");
    let size = copy_with_progress(&mut reader, &mut writer, &progress).await;
    progress.finish_and_clear();
    let size = size.context("Copy interrupted")?;

    writer.close().await?;
    session.settle(session.flush_timeout).await?;

    Ok(TransferOutput::new(display_url(src), display_url(&dst), size))
}

/// Resolve a destination URL whose key ends with '/' to `<key><source name>`
fn blob_target(url: &str, source: &Location) -> anyhow::Result<String> {
    let (path, rest) = match url.find(['?', ';']) {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    if !path.ends_with('/') {
        return Ok(url.to_string());
    }
    let name = source
        .file_name()
        .context("Cannot derive a blob key from the source")?;
    Ok(format!("{path}{name}{rest}"))
}

/// Copy `reader` into `writer`, advancing the progress bar
pub(super) async fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    progress: &ProgressBar,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
        progress.inc(n as u64);
    }
    writer.flush().await?;
    Ok(total)
}
