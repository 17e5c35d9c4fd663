use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use sweeper::{DatabaseReport, SweepError, SweepMode, Sweeper};

#[derive(Parser, Debug)]
#[command(name = "tempsweep")]
#[command(about = "Find and drop temporary schemas leaked by dead sessions")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report orphaned temp schemas without changing anything (default)
    Scan {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
    /// Drop every orphaned temp schema
    Drop {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
    /// Write a repair SQL script per database instead of dropping
    Script {
        #[arg(long, help = "Directory for repair scripts (overrides configuration)")]
        out: Option<String>,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for Command {
    fn default() -> Self {
        Self::Scan { json: false }
    }
}

fn print_reports(reports: &[DatabaseReport], mode: SweepMode, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(reports).context("Failed to serialize report")?;
        println!("{json}");
        return Ok(());
    }

    for report in reports {
        match mode {
            SweepMode::Drop => {
                println!(
                    "{}: dropped {} orphaned temp schema(s)",
                    report.database,
                    report.dropped.len()
                );
                for name in &report.dropped {
                    println!("  {name}");
                }
            }
            _ => {
                println!(
                    "{}: {} orphaned temp schema(s)",
                    report.database,
                    report.orphans.len()
                );
                for orphan in report.orphans.iter() {
                    println!("  {} ({})", orphan.name, orphan.reason);
                }
                if let Some(path) = &report.script {
                    println!("  repair script: {}", path.display());
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let mut config = utils::load_config(cli.common.config.as_ref())?;

    let command = cli.command.unwrap_or_default();
    let (mode, json) = match command {
        Command::Common(ref common_cmd) => {
            return utils::handle_common_command(common_cmd, &config);
        }
        Command::Scan { json } => (SweepMode::Scan, json),
        Command::Drop { json } => (SweepMode::Drop, json),
        Command::Script { out } => {
            if let Some(dir) = out {
                config.sweep.repair_dir = dir;
            }
            (SweepMode::Script, false)
        }
    };

    utils::validate_config(&config)?;
    log::info!(
        "Connecting to {} ({})",
        utils::redact_dsn(&config.database.dsn),
        config.database.flavor
    );

    match Sweeper::new(config).run(mode).await {
        Ok(reports) => print_reports(&reports, mode, json),
        Err(SweepError::Partial {
            database,
            reports,
            source,
        }) => {
            // Databases already swept still get reported.
            print_reports(&reports, mode, json)?;
            Err(anyhow::Error::new(*source)
                .context(format!("Failed to sweep orphaned temp schemas in {database}")))
        }
        Err(e) => Err(e).context("Failed to sweep orphaned temp schemas"),
    }
}
