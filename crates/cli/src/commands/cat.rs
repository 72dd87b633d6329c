//! cat command - Write blob contents to stdout
//!
//! Streams the blob; nothing is buffered beyond the copy buffer.

use anyhow::Context as _;
use clap::Args;
use tokio::io::AsyncWriteExt;

use super::Session;
use crate::exit_code::ExitCode;

/// Write blob contents to stdout
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Blob URL (blob://provider/container/key[?id=instance])
    pub url: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, session: &Session) -> ExitCode {
    match stream_to_stdout(&args.url, session).await {
        Ok(_) => ExitCode::Success,
        Err(e) => session.formatter.fail(&e),
    }
}

async fn stream_to_stdout(url: &str, session: &Session) -> anyhow::Result<u64> {
    let mut reader = session.protocol.open_read(url).await?;
    let mut stdout = tokio::io::stdout();

    let copied = tokio::io::copy(&mut reader, &mut stdout)
        .await
        .context("Failed to write to stdout")?;
    stdout.flush().await?;

    tracing::debug!(bytes = copied, "Streamed blob to stdout");
    Ok(copied)
}
