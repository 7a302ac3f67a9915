//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::account::{AzureStorageAccountClient, ReconcileRequest, StorageAccountReconciler};
use crate::auth::AuthProviderFactory;
use crate::config::{self, Config, CredentialType};
use crate::error::{Result, StorsyncError};
use crate::utils::format::{OutputFormat, TableFormatter};

fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser)]
#[command(name = "storsync")]
#[command(about = "Reconcile Azure Storage account monitoring and private endpoint approvals")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Disable colored table output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Azure credential type to use (default, clientsecret)
    #[arg(long, global = true, value_name = "TYPE", env = "STORSYNC_CREDENTIAL_TYPE")]
    pub credential_type: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a storage account against the desired state (alias: apply)
    #[command(alias = "apply")]
    Reconcile(ReconcileArgs),
    /// Show the current state of a storage account
    Show {
        /// Resource group of the account
        #[arg(short = 'g', long, alias = "resource-group-name")]
        resource_group: Option<String>,
        /// Storage account name
        #[arg(short, long)]
        name: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show version information
    Version,
}

#[derive(clap::Args, Debug, Default)]
pub struct ReconcileArgs {
    /// YAML or JSON file describing the desired state
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Resource group of the account
    #[arg(short = 'g', long, alias = "resource-group-name")]
    pub resource_group: Option<String>,
    /// Storage account name
    #[arg(short, long)]
    pub name: Option<String>,
    /// Account location (defaults to the resource group's location)
    #[arg(short, long)]
    pub location: Option<String>,
    /// Retention days for logging and metrics on every sub-service; 0 disables
    #[arg(long, value_name = "DAYS")]
    pub enable_monitoring: Option<u32>,
    /// Approve private endpoint connections that are pending
    #[arg(long)]
    pub approve_private_endpoint_connections: bool,
    /// Report what would change without writing anything
    #[arg(long)]
    pub check: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Setting name
        key: String,
        /// Setting value
        value: String,
    },
    /// Show configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
}

impl Cli {
    /// Debug logging is on when either the flag or the config asks for it
    pub fn debug_enabled(&self, config: &Config) -> bool {
        self.debug || config.debug
    }

    pub async fn execute(self, mut config: Config) -> Result<()> {
        if let Some(cred_type) = &self.credential_type {
            config.credential_type = cred_type
                .parse::<CredentialType>()
                .map_err(StorsyncError::config)?;
        }
        if self.debug {
            config.debug = true;
        }

        let formatter = TableFormatter::new(self.format, self.no_color);

        match self.command {
            Commands::Reconcile(args) => execute_reconcile(args, &config, &formatter).await,
            Commands::Show {
                resource_group,
                name,
            } => execute_show(resource_group, &name, &config, &formatter).await,
            Commands::Config { command } => execute_config_command(command, config).await,
            Commands::Version => {
                println!("storsync {} ({})", get_version(), env!("GIT_BRANCH"));
                Ok(())
            }
        }
    }
}

fn create_reconciler(config: &Config) -> Result<StorageAccountReconciler> {
    config.validate()?;
    let auth_provider = AuthProviderFactory::create_provider(config)?;
    let client = AzureStorageAccountClient::new(auth_provider, config)?;
    Ok(StorageAccountReconciler::new(Arc::new(client)))
}

/// Read a request file as YAML (which also accepts JSON)
pub fn load_request_file(path: &Path) -> Result<ReconcileRequest> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Merge file contents and command-line flags; flags win
pub fn build_request(args: ReconcileArgs, config: &Config) -> Result<ReconcileRequest> {
    let mut request = match &args.file {
        Some(path) => load_request_file(path)?,
        None => ReconcileRequest::default(),
    };

    if args.resource_group.is_some() || request.resource_group.is_empty() {
        request.resource_group = config.resolve_resource_group(args.resource_group)?;
    }
    if let Some(name) = args.name {
        request.name = name;
    }
    if args.location.is_some() {
        request.location = args.location;
    }
    if args.enable_monitoring.is_some() {
        request.enable_monitoring = args.enable_monitoring;
    }
    request.approve_private_endpoint_connections |= args.approve_private_endpoint_connections;
    request.check_mode |= args.check;

    request.validate()?;
    Ok(request)
}

async fn execute_reconcile(
    args: ReconcileArgs,
    config: &Config,
    formatter: &TableFormatter,
) -> Result<()> {
    let request = build_request(args, config)?;
    let reconciler = create_reconciler(config)?;

    let outcome = reconciler.reconcile(&request).await?;
    info!("Reconciliation complete (changed = {})", outcome.changed);

    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}

async fn execute_show(
    resource_group: Option<String>,
    name: &str,
    config: &Config,
    formatter: &TableFormatter,
) -> Result<()> {
    let resource_group = config.resolve_resource_group(resource_group)?;
    let reconciler = create_reconciler(config)?;

    let snapshot = reconciler.show(&resource_group, name).await?;
    println!("{}", formatter.format_snapshot(&snapshot)?);
    Ok(())
}

async fn execute_config_command(command: ConfigCommands, mut config: Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let formatter = TableFormatter::new(OutputFormat::Table, true);
            let pairs: Vec<(&str, String)> = config.display_pairs();
            println!("{}", formatter.format_key_value_pairs(&pairs));
        }
        ConfigCommands::Set { key, value } => {
            config.set_value(&key, &value)?;
            config::save_config(&config).await?;
            println!("Set {key} = {value}");
        }
        ConfigCommands::Path => {
            println!("{}", Config::get_config_path()?.display());
        }
        ConfigCommands::Init => {
            let path = config::init_default_config().await?;
            println!("Configuration file: {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reconcile_flags() {
        let cli = Cli::try_parse_from([
            "storsync",
            "reconcile",
            "-g",
            "rg1",
            "-n",
            "acct1",
            "--enable-monitoring",
            "15",
            "--approve-private-endpoint-connections",
        ])
        .unwrap();

        match cli.command {
            Commands::Reconcile(args) => {
                assert_eq!(args.resource_group.as_deref(), Some("rg1"));
                assert_eq!(args.enable_monitoring, Some(15));
                assert!(args.approve_private_endpoint_connections);
                assert!(!args.check);
            }
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_debug_from_flag_or_config() {
        let quiet = Cli::try_parse_from(["storsync", "version"]).unwrap();
        let loud = Cli::try_parse_from(["storsync", "--debug", "version"]).unwrap();
        let debug_config = Config {
            debug: true,
            ..Config::default()
        };

        assert!(!quiet.debug_enabled(&Config::default()));
        assert!(quiet.debug_enabled(&debug_config));
        assert!(loud.debug_enabled(&Config::default()));
    }

    #[test]
    fn test_build_request_uses_config_resource_group() {
        let config = Config {
            default_resource_group: "default-rg".to_string(),
            ..Config::default()
        };
        let args = ReconcileArgs {
            name: Some("acct1".to_string()),
            check: true,
            ..Default::default()
        };

        let request = build_request(args, &config).unwrap();
        assert_eq!(request.resource_group, "default-rg");
        assert_eq!(request.name, "acct1");
        assert!(request.check_mode);
        assert_eq!(request.enable_monitoring, None);
    }

    #[test]
    fn test_build_request_rejects_missing_name() {
        let args = ReconcileArgs {
            resource_group: Some("rg1".to_string()),
            ..Default::default()
        };
        assert!(build_request(args, &Config::default()).is_err());
    }
}
