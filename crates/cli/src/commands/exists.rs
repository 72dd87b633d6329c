//! exists command - Check whether a blob exists
//!
//! Exits 0 when the blob is present and 5 when it is not, so scripts can
//! branch on the exit code alone.

use clap::Args;
use serde::Serialize;

use super::{Session, display_url};
use crate::exit_code::ExitCode;

/// Check whether a blob exists
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Blob URL (blob://provider/container/key[?id=instance])
    pub url: String,
}

#[derive(Debug, Serialize)]
struct ExistsOutput {
    url: String,
    exists: bool,
}

impl std::fmt::Display for ExistsOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exists {
            write!(f, "{} exists", self.url)
        } else {
            write!(f, "{} not found", self.url)
        }
    }
}

/// Execute the exists command
pub async fn execute(args: ExistsArgs, session: &Session) -> ExitCode {
    match check_blob(&args.url, session).await {
        Ok(exists) => {
            session.formatter.output(&ExistsOutput {
                url: display_url(&args.url),
                exists,
            });
            if exists {
                ExitCode::Success
            } else {
                ExitCode::NotFound
            }
        }
        Err(e) => session.formatter.fail(&e),
    }
}

async fn check_blob(url: &str, session: &Session) -> anyhow::Result<bool> {
    let exists = session.protocol.blob_exists(url).await?;
    tracing::debug!(exists, "Checked blob existence");
    Ok(exists)
}
