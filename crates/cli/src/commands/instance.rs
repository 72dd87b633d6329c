//! Instance management commands
//!
//! Instances are named backends registered at startup; blob URLs select one
//! with `?id=<instance>` or implicitly by provider.

use std::fmt;

use clap::Subcommand;
use comfy_table::Table;
use serde::Serialize;

use bw_core::{InstanceConfig, InstanceManager};

use crate::exit_code::ExitCode;
use crate::output::Formatter;

const BUCKET_LOOKUP_STYLES: &[&str] = &["auto", "path", "dns"];

/// Instance subcommands
#[derive(Subcommand, Debug)]
pub enum InstanceCommands {
    /// Add or update an instance
    Set(SetArgs),

    /// List configured instances
    List,

    /// Remove an instance
    Remove(RemoveArgs),
}

/// Arguments for the `instance set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Instance id, matched by `?id=` in blob URLs
    pub id: String,

    /// Provider selector (e.g. "s3", "aws-s3", "transient")
    pub selector: String,

    /// Service endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access key / account identity
    #[arg(long, default_value = "")]
    pub identity: String,

    /// Secret key
    #[arg(long, default_value = "", env = "BW_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,
}

/// Arguments for the `instance remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Id of the instance to remove
    pub id: String,
}

/// Instance information for output (without secrets)
#[derive(Debug, Serialize)]
struct InstanceInfo {
    id: String,
    selector: String,
    endpoint: Option<String>,
    region: String,
    bucket_lookup: String,
}

impl From<&InstanceConfig> for InstanceInfo {
    fn from(instance: &InstanceConfig) -> Self {
        Self {
            id: instance.id.clone(),
            selector: instance.selector.clone(),
            endpoint: instance.endpoint.clone(),
            region: instance.region.clone(),
            bucket_lookup: instance.bucket_lookup.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InstanceListOutput {
    instances: Vec<InstanceInfo>,
}

impl fmt::Display for InstanceListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instances.is_empty() {
            return write!(f, "No instances configured.");
        }

        let mut table = Table::new();
        table.set_header(vec!["ID", "SELECTOR", "ENDPOINT", "REGION", "LOOKUP"]);
        for i in &self.instances {
            table.add_row(vec![
                i.id.clone(),
                i.selector.clone(),
                i.endpoint.clone().unwrap_or_else(|| "-".to_string()),
                i.region.clone(),
                i.bucket_lookup.clone(),
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, Serialize)]
struct InstanceOperationOutput {
    success: bool,
    instance: String,
    message: String,
}

impl fmt::Display for InstanceOperationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Execute an instance subcommand
pub fn execute(cmd: InstanceCommands, formatter: &Formatter) -> ExitCode {
    let manager = match InstanceManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    match cmd {
        InstanceCommands::Set(args) => execute_set(args, &manager, formatter),
        InstanceCommands::List => execute_list(&manager, formatter),
        InstanceCommands::Remove(args) => execute_remove(args, &manager, formatter),
    }
}

fn execute_set(args: SetArgs, manager: &InstanceManager, formatter: &Formatter) -> ExitCode {
    if let Err(msg) = validate_set(&args) {
        formatter.error(&msg);
        return ExitCode::UsageError;
    }

    let mut instance = InstanceConfig::new(&args.id, &args.selector, args.identity, args.secret);
    instance.endpoint = args.endpoint;
    instance.region = args.region;
    instance.bucket_lookup = args.bucket_lookup;

    match manager.set(instance) {
        Ok(()) => {
            formatter.output(&InstanceOperationOutput {
                success: true,
                message: format!("Instance '{}' configured successfully.", args.id),
                instance: args.id,
            });
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn execute_list(manager: &InstanceManager, formatter: &Formatter) -> ExitCode {
    match manager.list() {
        Ok(instances) => {
            formatter.output(&InstanceListOutput {
                instances: instances.iter().map(InstanceInfo::from).collect(),
            });
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn execute_remove(args: RemoveArgs, manager: &InstanceManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.id) {
        Ok(()) => {
            formatter.output(&InstanceOperationOutput {
                success: true,
                message: format!("Instance '{}' removed successfully.", args.id),
                instance: args.id,
            });
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn validate_set(args: &SetArgs) -> Result<(), String> {
    if args.id.trim().is_empty() {
        return Err("Instance id cannot be empty".to_string());
    }
    if args.selector.trim().is_empty() {
        return Err("Selector cannot be empty".to_string());
    }
    if !BUCKET_LOOKUP_STYLES.contains(&args.bucket_lookup.as_str()) {
        return Err("Bucket lookup must be 'auto', 'path', or 'dns'".to_string());
    }
    Ok(())
}
