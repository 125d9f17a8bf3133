//! Command-line entry point for the pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use huntsman::pipeline::ReprocessStage;
use huntsman::{config, Pipeline, RunOptions};

#[derive(Parser)]
#[command(name = "huntsman", version, about = "Job posting pipeline: scrape, rank, generate")]
struct Cli {
    /// Config file (YAML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest job drafts from a JSON file
    Scrape(ScrapeArgs),
    /// Rank scraped jobs against the scoring templates
    Rank(RankArgs),
    /// Generate application documents for qualified jobs
    Generate(GenerateArgs),
    /// Run a full cycle: sweep, optional scrape, rank, generate
    Run(RunArgs),
    /// Return stale claims to their input statuses
    Sweep,
    /// Reset errored records so a stage picks them up again
    Reprocess(ReprocessArgs),
    /// Show record counts per status
    Status,
}

#[derive(Args)]
struct ScrapeArgs {
    /// JSON file holding an array of job drafts
    #[arg(long)]
    input: PathBuf,
}

#[derive(Args)]
struct RankArgs {
    /// Batch size override
    #[arg(long)]
    limit: Option<u64>,

    /// Re-rank already ranked and errored records
    #[arg(long)]
    reprocess: bool,

    /// Rank raw descriptions without translating
    #[arg(long)]
    no_translate: bool,

    #[command(flatten)]
    daemon: DaemonArgs,
}

#[derive(Args)]
struct GenerateArgs {
    /// Batch size override
    #[arg(long)]
    limit: Option<u64>,

    /// Retry errored records
    #[arg(long)]
    reprocess: bool,

    /// Store documents in the database only, no files
    #[arg(long)]
    skip_render: bool,

    #[command(flatten)]
    daemon: DaemonArgs,
}

#[derive(Args)]
struct RunArgs {
    /// JSON file to ingest before ranking
    #[arg(long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    daemon: DaemonArgs,
}

#[derive(Args)]
struct DaemonArgs {
    /// Keep running, repeating at the configured interval
    #[arg(long)]
    daemon: bool,

    /// Seconds between cycles (daemon mode)
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Args)]
struct ReprocessArgs {
    /// Stage whose errored records to reset
    #[arg(long, value_enum)]
    stage: StageArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StageArg {
    Rank,
    Generate,
}

impl From<StageArg> for ReprocessStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Rank => ReprocessStage::Rank,
            StageArg::Generate => ReprocessStage::Generate,
        }
    }
}

fn init_logging() {
    // The library logs through both `log` and `tracing`; bridge the
    // former into the latter and let RUST_LOG filter.
    let _ = tracing_log::LogTracer::init();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> huntsman::Result<()> {
    let settings = config::load_or_default(cli.config.as_deref())?;
    let interval = Duration::from_secs(settings.daemon_interval_secs);
    let pipeline = Pipeline::new(settings)?;

    match cli.command {
        Command::Scrape(args) => {
            let report = pipeline.run_scrape(&args.input)?;
            println!(
                "Scraped {} drafts: {} inserted, {} updated",
                report.fetched, report.inserted, report.updated
            );
            Ok(())
        }
        Command::Rank(args) => {
            let options = RunOptions {
                limit: args.limit,
                reprocess: args.reprocess,
                translate: !args.no_translate,
                ..RunOptions::default()
            };
            repeat(&args.daemon, interval, || {
                let report = pipeline.run_rank(&options)?;
                println!(
                    "Ranked {}: {} ok, {} failed, {} race losses, {} released",
                    report.claimed,
                    report.succeeded,
                    report.failed,
                    report.race_losses,
                    report.released
                );
                Ok(())
            })
        }
        Command::Generate(args) => {
            let options = RunOptions {
                limit: args.limit,
                reprocess: args.reprocess,
                skip_rendering: args.skip_render.then_some(true),
                ..RunOptions::default()
            };
            repeat(&args.daemon, interval, || {
                let report = pipeline.run_generate(&options)?;
                println!(
                    "Generated {}: {} ok, {} failed, {} race losses, {} released",
                    report.claimed,
                    report.succeeded,
                    report.failed,
                    report.race_losses,
                    report.released
                );
                Ok(())
            })
        }
        Command::Run(args) => repeat(&args.daemon, interval, || {
            let report = pipeline.run_once(args.input.as_deref(), &RunOptions::default())?;
            println!(
                "Cycle done: ranked {} ({} ok), generated {} ({} ok), swept {}",
                report.rank.claimed,
                report.rank.succeeded,
                report.generate.claimed,
                report.generate.succeeded,
                report.sweep.ranking_reset + report.sweep.generating_reset
            );
            Ok(())
        }),
        Command::Sweep => {
            let report = pipeline.sweep()?;
            println!(
                "Swept {} ranking and {} generating claims",
                report.ranking_reset, report.generating_reset
            );
            Ok(())
        }
        Command::Reprocess(args) => {
            let reset = pipeline.reprocess_errors(args.stage.into())?;
            println!("Reset {reset} errored records");
            Ok(())
        }
        Command::Status => {
            let counts = pipeline.status_counts()?;
            for (status, count) in counts {
                println!("{status:<14} {count}");
            }
            Ok(())
        }
    }
}

/// Runs `work` once, or in a loop with the given interval when daemon
/// mode is on. Ctrl-C finishes the current cycle, then exits cleanly.
fn repeat<F>(daemon: &DaemonArgs, default_interval: Duration, mut work: F) -> huntsman::Result<()>
where
    F: FnMut() -> huntsman::Result<()>,
{
    if !daemon.daemon {
        return work();
    }

    let interval = daemon
        .interval
        .map(Duration::from_secs)
        .unwrap_or(default_interval);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Shutdown requested, finishing current cycle");
        handler_flag.store(false, Ordering::SeqCst);
    }) {
        log::warn!("Failed to install Ctrl-C handler: {e}");
    }

    log::info!("Daemon mode, interval {}s", interval.as_secs());
    while running.load(Ordering::SeqCst) {
        work()?;

        // Sleep in one-second steps so shutdown stays responsive.
        let mut remaining = interval.as_secs();
        while remaining > 0 && running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_secs(1));
            remaining -= 1;
        }
    }

    Ok(())
}
