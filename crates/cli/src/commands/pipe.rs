//! pipe command - Stream stdin into a blob
//!
//! Reads stdin until EOF, closes the writer and then waits for the commit
//! so the exit code reflects whether the blob actually landed.

use std::time::Duration;

use clap::Args;

use super::cp::copy_with_progress;
use super::{Session, TransferOutput, display_url};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Stream stdin into a blob
#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Destination blob URL (blob://provider/container/key[?id=instance])
    pub url: String,

    /// Seconds to wait for the commit (0 waits without bound)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Execute the pipe command
pub async fn execute(args: PipeArgs, session: &Session) -> ExitCode {
    let timeout = match args.timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => session.flush_timeout,
    };

    match pipe_stdin(&args.url, timeout, session).await {
        Ok(size) => {
            session
                .formatter
                .output(&TransferOutput::new("stdin", display_url(&args.url), size));
            ExitCode::Success
        }
        Err(e) => session.formatter.fail(&e),
    }
}

async fn pipe_stdin(
    url: &str,
    timeout: Option<Duration>,
    session: &Session,
) -> anyhow::Result<u64> {
    let mut writer = session.protocol.open_write(url).await?;
    let progress = ProgressBar::bytes_spinner(session.formatter.config(), "Reading stdin");

    let mut stdin = tokio::io::stdin();
    let size = copy_with_progress(&mut stdin, &mut writer, &progress).await;
    progress.finish_and_clear();
    // An error here drops the writer unclosed, which discards the staged data
    let size = size?;

    writer.close().await?;
    session.settle(timeout).await?;
    Ok(size)
}
