//! CLI command definitions and execution
//!
//! Every command that touches blobs goes through a `BlobProtocol` built from
//! the config file, so URLs resolve the same way in every command.

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use bw_core::{BlobProtocol, CommitStats};

use crate::context;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod cat;
mod completions;
pub mod cp;
mod exists;
mod instance;
mod pipe;

/// bw - blob:// URL client
///
/// Streams data to and from object storage addressed by
/// `blob://[identity:secret@]provider/container/key[?id=instance]` URLs.
#[derive(Parser, Debug)]
#[command(name = "bw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write blob contents to stdout
    Cat(cat::CatArgs),

    /// Stream stdin into a blob
    Pipe(pipe::PipeArgs),

    /// Copy between local files and blob URLs
    Cp(cp::CpArgs),

    /// Check whether a blob exists
    Exists(exists::ExistsArgs),

    /// Manage configured backend instances
    #[command(subcommand)]
    Instance(instance::InstanceCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let flags = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    let command = match cli.command {
        Commands::Completions(args) => return completions::execute(args),
        command => command,
    };

    let config = match context::load_config() {
        Ok(config) => config,
        Err(e) => return Formatter::new(flags).fail(&e),
    };
    let formatter = Formatter::new(flags.with_defaults(&config.defaults));

    match command {
        Commands::Instance(cmd) => instance::execute(cmd, &formatter),
        command => {
            let protocol = match context::build_protocol(&config).await {
                Ok(protocol) => protocol,
                Err(e) => return formatter.fail(&e),
            };
            let session = Session {
                protocol,
                formatter,
                flush_timeout: config.defaults.flush_timeout(),
            };
            match command {
                Commands::Cat(args) => cat::execute(args, &session).await,
                Commands::Pipe(args) => pipe::execute(args, &session).await,
                Commands::Cp(args) => cp::execute(args, &session).await,
                Commands::Exists(args) => exists::execute(args, &session).await,
                Commands::Instance(_) | Commands::Completions(_) => ExitCode::UsageError,
            }
        }
    }
}

/// Everything a blob command needs
pub struct Session {
    pub protocol: BlobProtocol,
    pub formatter: Formatter,
    pub flush_timeout: Option<Duration>,
}

impl Session {
    /// Wait for pending commits and fail if any of them did not land
    pub async fn settle(&self, timeout: Option<Duration>) -> anyhow::Result<CommitStats> {
        self.protocol.flush(timeout).await?;
        let stats = self.protocol.commit_stats();
        if stats.failed > 0 {
            return Err(bw_core::Error::CommitFailure {
                target: format!("{} blob(s)", stats.failed),
                reason: "see log for details".to_string(),
            }
            .into());
        }
        Ok(stats)
    }
}

/// JSON/human report for a completed transfer
#[derive(Debug, Serialize)]
pub struct TransferOutput {
    pub status: &'static str,
    pub source: String,
    pub target: String,
    pub size_bytes: u64,
    pub size_human: String,
}

impl TransferOutput {
    pub fn new(source: impl Into<String>, target: impl Into<String>, size: u64) -> Self {
        Self {
            status: "success",
            source: source.into(),
            target: target.into(),
            size_bytes: size,
            size_human: humansize::format_size(size, humansize::BINARY),
        }
    }
}

impl std::fmt::Display for TransferOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.size_human)
    }
}

/// Strip inline credentials from a URL before it is printed
pub fn display_url(url: &str) -> String {
    match bw_core::parse_address(url) {
        Ok(address) => format!("blob://{address}"),
        Err(_) => url.to_string(),
    }
}
