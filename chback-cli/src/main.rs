use anyhow::{bail, Context, Result};
use chback_core::reconcile::AuditReport;
use chback_core::{init_logging_with_config, Backend, Config, LogConfig, LogLevel};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chback")]
#[command(author, version, about = "Administration of the chback rating backend", long_about = None)]
struct Args {
    /// Config file (TOML); CHBACK_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create both databases if needed and apply pending migrations
    Migrate,

    /// Compare variation rosters with account vote histories
    Audit {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error when the stores disagree
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Repair drift, taking the variation rosters as authoritative
    Reconcile {
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Load and validate the configuration
    Check,

    /// Write a default configuration file
    Init {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut out = std::io::stdout().lock();

    if let Command::Config(ConfigCommand::Init { path, force }) = &args.command {
        return init_config(path, *force, &mut out);
    }

    let config_path = args
        .config
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()));
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    let mut log_config = LogConfig::from_settings(&config.logging)?;
    if let Some(level) = &args.log_level {
        log_config = LogConfig::new(level.parse::<LogLevel>()?)
            .with_target(config.logging.with_target);
    }
    init_logging_with_config(log_config.json_format(args.json_logs || config.logging.json_format))?;

    match args.command {
        Command::Config(ConfigCommand::Show) => show_config(&config, &mut out),
        Command::Config(ConfigCommand::Check) => {
            writeln!(out, "Configuration is valid")?;
            Ok(())
        }
        Command::Config(ConfigCommand::Init { .. }) => Ok(()),
        command => {
            let backend = Backend::open(&config).context("Failed to open stores")?;
            info!("Stores opened");
            run(&backend, command, &mut out).await
        }
    }
}

async fn run(backend: &Backend, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Migrate => migrate(backend, out),
        Command::Audit { json, fail_on_drift } => {
            let report = backend.reconciler.audit().await?;
            print_report(&report, json, out)?;
            if fail_on_drift && !report.is_consistent() {
                bail!("{} disagreements between the stores", report.drift.len());
            }
            Ok(())
        }
        Command::Reconcile { dry_run: true } => {
            let report = backend.reconciler.audit().await?;
            print_report(&report, false, out)?;
            writeln!(out, "Dry run; nothing written")?;
            Ok(())
        }
        Command::Reconcile { dry_run: false } => {
            let summary = backend.reconciler.reconcile().await?;
            writeln!(
                out,
                "Repaired {} disagreements: {} histories rewritten, {} orphaned votes retracted, {} double votes cleared",
                summary.drift_found,
                summary.histories_rewritten,
                summary.orphans_retracted,
                summary.double_votes_cleared
            )?;
            Ok(())
        }
        Command::Config(_) => Ok(()),
    }
}

/// Opening the backend already migrated both stores; report where they stand
fn migrate(backend: &Backend, out: &mut impl Write) -> Result<()> {
    for store in [backend.content_store.executor(), backend.account_store.executor()] {
        let version = store.schema_version()?;
        writeln!(out, "{} store: schema version {}", store.name(), version)?;
    }
    Ok(())
}

fn print_report(report: &AuditReport, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        return Ok(());
    }

    writeln!(
        out,
        "Scanned {} variations and {} accounts",
        report.variations_scanned, report.accounts_scanned
    )?;
    for drift in &report.drift {
        writeln!(out, "  - {}", drift)?;
    }
    if report.is_consistent() {
        writeln!(out, "Stores are consistent")?;
    } else {
        writeln!(out, "{} disagreements found", report.drift.len())?;
    }
    Ok(())
}

fn show_config(config: &Config, out: &mut impl Write) -> Result<()> {
    let mut shown = config.clone();
    if shown.token.secret.is_some() {
        shown.token.secret = Some("<redacted>".to_string());
    }

    write!(out, "{}", toml::to_string_pretty(&shown)?)?;
    Ok(())
}

fn init_config(path: &Path, force: bool, out: &mut impl Write) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    Config::default().save_to_file(path)?;
    writeln!(out, "Wrote default configuration to {}", path.display())?;
    Ok(())
}
