use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared across all binaries
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Commands that inspect the tool itself rather than a cluster
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level implied by the verbosity flags
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments
    pub fn init_logging(args: &CommonArgs) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(log_level(args)))
            .with_writer(std::io::stderr)
            .init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("tempsweep configuration:");
            println!("========================");
            println!("Database DSN: {}", redact_dsn(&config.database.dsn));
            println!("Flavor: {}", config.database.flavor);
            println!("Connect timeout: {:?}", config.database.connect_timeout);

            if config.sweep.all_databases {
                println!("Databases: all accepting connections");
            } else if config.sweep.databases.is_empty() {
                println!("Databases: from DSN");
            } else {
                println!("Databases: {}", config.sweep.databases.join(", "));
            }
            println!("Repair directory: {}", config.sweep.repair_dir);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        if config.database.dsn.trim().is_empty() {
            anyhow::bail!("Database DSN cannot be empty");
        }

        if config.sweep.all_databases && !config.sweep.databases.is_empty() {
            anyhow::bail!("sweep.databases cannot be combined with sweep.all_databases");
        }

        if config.sweep.databases.iter().any(|db| db.trim().is_empty()) {
            anyhow::bail!("sweep.databases cannot contain an empty database name");
        }

        if config.sweep.repair_dir.trim().is_empty() {
            anyhow::bail!("Repair directory cannot be empty");
        }

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle common CLI commands that don't require a cluster connection
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Hide the password component of a connection string
    pub fn redact_dsn(dsn: &str) -> String {
        let Some((scheme, rest)) = dsn.split_once("://") else {
            return dsn.to_string();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return dsn.to_string();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => dsn.to_string(),
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}
