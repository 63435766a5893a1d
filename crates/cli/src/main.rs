//! Uptime Warden CLI
//!
//! Lists cloud resources from a recorded snapshot and runs one-off
//! escalation audits against it.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warden_lib::{ResourceState, TagFilter};

/// Uptime Warden CLI
#[derive(Parser)]
#[command(name = "wardenctl")]
#[command(author, version, about = "CLI for Uptime Warden, the cloud resource uptime monitor", long_about = None)]
pub struct Cli {
    /// Path to the CLI config file (default: ~/.config/wardenctl/config.json)
    #[arg(long, env = "WARDENCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where resources come from and which ones to keep
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Snapshot file with provider-native records
    #[arg(long, env = "WARDEN_SNAPSHOT_PATH")]
    pub snapshot: Option<PathBuf>,

    /// Only keep resources in these states (comma separated)
    #[arg(long = "state", value_delimiter = ',', value_parser = parse_state)]
    pub states: Vec<ResourceState>,

    /// Only keep resources with this tag (`key` or `key:value`)
    #[arg(long)]
    pub tag: Option<TagFilter>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List resources with their state, uptime and owner
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Run one escalation pass and report tiers, digests and remediation
    Audit {
        #[command(flatten)]
        source: SourceArgs,

        /// Warning threshold in hours
        #[arg(long, env = "WARDEN_WARNING_THRESHOLD_HOURS")]
        warning_hours: Option<f64>,

        /// Critical threshold in hours
        #[arg(long, env = "WARDEN_CRITICAL_THRESHOLD_HOURS")]
        critical_hours: Option<f64>,

        /// Dispatch owner notifications (log transport)
        #[arg(long)]
        notify: bool,

        /// Request remediation of critical resources (dry run)
        #[arg(long)]
        remediate: bool,

        /// Resource group never remediated (repeatable, substring match)
        #[arg(long = "exempt-group")]
        exempt_groups: Vec<String>,

        /// Account label used in alerts
        #[arg(long, env = "WARDEN_ACCOUNT")]
        account: Option<String>,

        /// Print the composed alert for every owner
        #[arg(long)]
        show_alerts: bool,
    },
}

fn parse_state(raw: &str) -> Result<ResourceState, String> {
    match ResourceState::parse(raw) {
        ResourceState::Unknown if !raw.trim().eq_ignore_ascii_case("unknown") => {
            Err(format!("unknown resource state `{}`", raw))
        }
        state => Ok(state),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::List { source } => {
            commands::list::list_resources(&source, &config, cli.format).await?;
        }
        Commands::Audit {
            source,
            warning_hours,
            critical_hours,
            notify,
            remediate,
            exempt_groups,
            account,
            show_alerts,
        } => {
            let options = commands::audit::AuditOptions {
                warning_hours,
                critical_hours,
                notify,
                remediate,
                exempt_groups,
                account,
                show_alerts,
            };
            commands::audit::run_audit(&source, &options, &config, cli.format).await?;
        }
    }

    Ok(())
}
