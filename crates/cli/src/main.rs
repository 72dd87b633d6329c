//! bw - blob:// URL client
//!
//! A command-line interface for streaming data to and from object storage
//! through `blob://` URLs.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use blobwire_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `bw cat` output stays byte-exact
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
