use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use racescout::{
    config::CliOverrides, EncodingMode, Outcome, RaceConfig, RaceMetrics, RaceStats, SearchError,
    SearchOutcome, SearchReport, Verdict, WorkerStatus,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FOUND: u8 = 0;
const EXIT_NOT_FOUND: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Race parallel workers over a line-oriented file; the first match wins
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset file, one entry per line
    file: PathBuf,

    /// Exact string to search for
    key: String,

    /// Number of workers to race
    #[arg(allow_negative_numbers = true)]
    workers: i64,

    /// Extra configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abort the race after this long (e.g. 500ms, 2s)
    #[arg(short, long)]
    timeout: Option<String>,

    /// How to handle invalid UTF-8 (failfast|lossy)
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Show what every worker did
    #[arg(short, long)]
    verbose: bool,

    /// Print a one-line summary of the race
    #[arg(short, long)]
    stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let workers = usize::try_from(cli.workers)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| SearchError::usage("NUMBER OF WORKERS must be a positive integer"))?;

    let config = RaceConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(CliOverrides {
            dataset_path: Some(cli.file),
            key: Some(cli.key),
            worker_count: Some(workers),
            deadline: cli.timeout,
            encoding_mode: cli.encoding,
            log_level: cli.log_level,
        });

    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let metrics = RaceMetrics::new();
    let outcome = racescout::search_with_metrics(&config, metrics.clone())
        .with_context(|| format!("cannot search {}", config.dataset_path.display()))?;

    let report = match outcome {
        SearchOutcome::EmptyDataset => {
            println!("File is empty. No string found.");
            return Ok(EXIT_NOT_FOUND);
        }
        SearchOutcome::Raced(report) => report,
    };

    if cli.verbose {
        print_workers(&report);
    }
    if cli.stats {
        print_stats(&metrics.get_stats(), &report);
    }

    Ok(print_verdict(&report, &config.key))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Prints the verdict and returns the matching exit code
fn print_verdict(report: &SearchReport, key: &str) -> u8 {
    match &report.verdict {
        Verdict::Success { position } => {
            let worker = report
                .winner()
                .map(|w| w.worker.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "[Worker {}] Found key '{}' at line {}",
                worker,
                key.green(),
                (position + 1).to_string().green()
            );
            let cancelled = report.cancelled_workers().count();
            if cancelled > 0 {
                println!("Key found! Cancelled {} remaining worker(s)", cancelled);
            }
            EXIT_FOUND
        }
        Verdict::Failure => {
            println!("No string found");
            EXIT_NOT_FOUND
        }
        Verdict::InfrastructureError(err) => {
            eprintln!("{} {}", "Search aborted:".red().bold(), err);
            EXIT_ERROR
        }
    }
}

fn print_workers(report: &SearchReport) {
    for summary in &report.workers {
        let status = match &summary.status {
            WorkerStatus::Completed(Outcome::Found { position }) => {
                format!("found at line {}", position + 1).green().to_string()
            }
            WorkerStatus::Completed(Outcome::NotFound) => "not found".to_string(),
            WorkerStatus::Failed(message) => format!("failed: {}", message).red().to_string(),
            WorkerStatus::Cancelled => "cancelled".yellow().to_string(),
            WorkerStatus::Running => "running".to_string(),
        };
        println!(
            "[Worker {}] {} {}",
            summary.worker,
            summary.section.to_string().blue(),
            status
        );
    }
}

fn print_stats(stats: &RaceStats, report: &SearchReport) {
    println!(
        "Scanned {} items with {} workers in {:.2?} ({} completion(s), {} not found, {} failed, {} cancelled)",
        stats.items_scanned,
        stats.workers_launched,
        report.elapsed,
        stats.completions,
        stats.not_found_reports,
        stats.worker_failures,
        stats.cancellations
    );
}
