//! EMAScan CLI: EMA crossover scans over an NSE symbol universe.
//!
//! Commands:
//! - `scan`: run one batch and print the verdict table
//! - `watch`: run batches on the configured cron schedule until Ctrl-C
//! - `universe`: print the resolved symbol universe

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use emascan_runner::{
    export_csv, export_json, render_table, write_export, LatestBatch, ScanConfig, ScanScheduler,
    SourceKind,
};

#[derive(Parser)]
#[command(
    name = "emascan",
    about = "EMAScan: 50/200 EMA crossover scanner for NSE symbols"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch and print the verdict table.
    Scan {
        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read closes from a CSV file (Symbol, Date, Close) instead of Yahoo.
        #[arg(long, conflicts_with = "synthetic")]
        csv: Option<PathBuf>,

        /// Use deterministic synthetic prices (offline).
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Evaluation date (YYYY-MM-DD). Defaults to today, or the CSV's last date.
        #[arg(long)]
        as_of: Option<String>,

        /// Write the full batch as JSON.
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Write one CSV row per symbol.
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Print only crossed / approaching symbols.
        #[arg(long, default_value_t = false)]
        only_flagged: bool,
    },
    /// Re-run the batch on the configured cron schedule until Ctrl-C.
    Watch {
        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use deterministic synthetic prices (offline).
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Override the schedule with a fixed interval in seconds.
        #[arg(long)]
        every: Option<u64>,

        /// Print only crossed / approaching symbols.
        #[arg(long, default_value_t = false)]
        only_flagged: bool,
    },
    /// Print the resolved symbol universe.
    Universe {
        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            csv,
            synthetic,
            as_of,
            json_out,
            csv_out,
            only_flagged,
        } => run_scan(ScanArgs {
            config,
            csv,
            synthetic,
            as_of,
            json_out,
            csv_out,
            only_flagged,
        }),
        Commands::Watch {
            config,
            synthetic,
            every,
            only_flagged,
        } => run_watch(config, synthetic, every, only_flagged),
        Commands::Universe { config } => run_universe(config),
    }
}

struct ScanArgs {
    config: Option<PathBuf>,
    csv: Option<PathBuf>,
    synthetic: bool,
    as_of: Option<String>,
    json_out: Option<PathBuf>,
    csv_out: Option<PathBuf>,
    only_flagged: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}': expected YYYY-MM-DD"))
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(p) => {
            ScanConfig::from_file(p).with_context(|| format!("failed to load {}", p.display()))
        }
        None => Ok(ScanConfig::default()),
    }
}

/// Paths given on the command line are relative to the working directory,
/// not to the config file.
fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()
        .context("failed to resolve working directory")?
        .join(path))
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(csv) = args.csv {
        config.source.kind = SourceKind::Csv;
        config.source.csv_path = Some(absolute(csv)?);
    } else if args.synthetic {
        config.source.kind = SourceKind::Synthetic;
    }

    let mut job = config.build_job()?;
    if let Some(s) = &args.as_of {
        job.as_of = Some(parse_date(s)?);
    }
    let as_of = job.resolve_as_of();

    let batch = match job.run(as_of) {
        Ok(batch) => batch,
        Err(e) => bail!("scan failed: {e}"),
    };

    print!("{}", render_table(&batch, args.only_flagged));

    if let Some(path) = &args.json_out {
        write_export(path, &export_json(&batch)?)?;
        info!(path = %path.display(), "wrote JSON export");
    }
    if let Some(path) = &args.csv_out {
        write_export(path, &export_csv(&batch)?)?;
        info!(path = %path.display(), "wrote CSV export");
    }

    Ok(())
}

fn run_watch(
    config: Option<PathBuf>,
    synthetic: bool,
    every: Option<u64>,
    only_flagged: bool,
) -> Result<()> {
    let mut config = load_config(config.as_deref())?;
    if synthetic {
        config.source.kind = SourceKind::Synthetic;
    }
    let cron_expr = match every {
        Some(secs) => emascan_runner::cron_for_interval(secs)?,
        None => config.schedule.cron.clone(),
    };

    // Built before the runtime exists: the Yahoo source wraps a blocking HTTP
    // client, which must not be created or dropped on a runtime thread.
    let job = config.build_job()?;
    let source = Arc::clone(&job.source);
    let latest = Arc::new(LatestBatch::new());
    let scheduler = ScanScheduler::new(job, Arc::clone(&latest), &cron_expr)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(watch(
        scheduler,
        latest,
        config.schedule.run_on_start,
        only_flagged,
    ));
    drop(runtime);
    drop(source);
    result
}

async fn watch(
    scheduler: ScanScheduler,
    latest: Arc<LatestBatch>,
    run_on_start: bool,
    only_flagged: bool,
) -> Result<()> {
    let mut rx = latest.subscribe();

    if run_on_start {
        if let Err(e) = scheduler.run_now().await {
            warn!(error = %e, "watch: initial batch failed");
        }
    }

    scheduler.start().await?;
    if let Some(next) = scheduler.next_run() {
        info!(next = %next, cron = scheduler.cron_expr(), "watch: waiting for next run");
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let batch = rx.borrow_and_update().clone();
                if let Some(batch) = batch {
                    println!("{}", render_table(&batch, only_flagged));
                }
                if let Some(next) = scheduler.next_run() {
                    info!(next = %next, "watch: next run scheduled");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("watch: Ctrl-C received, shutting down");
                break;
            }
        }
    }

    scheduler.stop().await;
    Ok(())
}

fn run_universe(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let universe = config.resolve_universe()?;
    if universe.is_empty() {
        bail!("universe is empty");
    }

    for name in universe.list_names() {
        let members = universe.list(name).unwrap_or_default();
        println!("{name} ({} symbols)", members.len());
        for chunk in members.chunks(8) {
            println!("  {}", chunk.join(", "));
        }
    }
    println!();
    println!("Total: {} distinct symbols", universe.len());
    Ok(())
}
