//! tessera: pull-based frame scheduler.
//!
//! Subcommands:
//! - `run`: coordinator plus in-process workers
//! - `coordinator`: ZeroMQ hub serving workers started separately
//! - `worker --rank N`: ZeroMQ spoke connecting to the hub
//!
//! Settings come from `tessera.toml`, then `TESSERA_*` environment
//! variables, then the flags below.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use tessera_core::load_dotenv;
use tessera_scheduler::runner::{build_processor, load_dataset, run_hub, run_local, run_spoke};
use tessera_scheduler::{RunReport, TesseraConfig, TextSink};

// ── CLI ─────────────────────────────────────────────────────────────

/// Distribute dataset frames across a pool of workers and reassemble the results.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about)]
struct Cli {
    /// Path to tessera.toml (defaults to ./tessera.toml when present).
    #[arg(long, env = "TESSERA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Worker pool size (overrides pool.workers).
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Hub endpoint, e.g. tcp://127.0.0.1:5570 (overrides transport.endpoint).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the coordinator and every worker in this process
    Run(OutputArgs),
    /// Run the coordinator as a ZeroMQ hub; start workers with `tessera worker`
    Coordinator(OutputArgs),
    /// Run one worker that connects to a hub
    Worker {
        /// Worker rank, 1..=pool size.
        #[arg(long, env = "TESSERA_WORKER_RANK")]
        rank: u32,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Results file (overrides output.path).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    stats_json: bool,
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = TesseraConfig::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.pool.workers = workers;
    }
    if let Some(endpoint) = cli.endpoint {
        config.transport.endpoint = endpoint;
        if config.transport.is_local() {
            config.transport.kind = if config.transport.endpoint.starts_with("ipc://") {
                "ipc".into()
            } else {
                "tcp".into()
            };
        }
    }
    config.validate()?;

    match cli.command {
        Command::Run(out) => {
            let dataset = load_dataset(&config.dataset)?;
            let processor = build_processor(&config.processing);
            let report = run_local(
                &dataset,
                config.window.dims(),
                config.pool.workers,
                processor,
            )
            .await?;
            for worker in &report.workers {
                info!(
                    worker = %worker.address,
                    tasks = worker.tasks_processed,
                    busy_ms = worker.busy.as_millis() as u64,
                    "worker summary"
                );
            }
            finish(&config, &out, &report)?;
        }
        Command::Coordinator(out) => {
            let endpoint = config.endpoint()?;
            let dataset = load_dataset(&config.dataset)?;
            let report = run_hub(
                &endpoint,
                &dataset,
                config.window.dims(),
                config.pool.workers,
            )
            .await?;
            finish(&config, &out, &report)?;
        }
        Command::Worker { rank } => {
            let workers = config.pool.workers;
            if rank == 0 || rank as usize > workers {
                anyhow::bail!("--rank must be between 1 and {workers}, got {rank}");
            }
            let endpoint = config.endpoint()?;
            let report = run_spoke(&endpoint, rank, build_processor(&config.processing)).await?;
            info!(
                worker = %report.address,
                tasks = report.tasks_processed,
                busy_ms = report.busy.as_millis() as u64,
                "worker done"
            );
        }
    }

    Ok(())
}

/// Write the results file and report the run. A failed write is logged, not fatal.
fn finish(config: &TesseraConfig, out: &OutputArgs, report: &RunReport) -> anyhow::Result<()> {
    let path = out.output.clone().unwrap_or_else(|| config.output.path.clone());
    let sink = TextSink::new(path);
    if let Err(e) = sink.write(&report.layout, &report.outcome.frames) {
        error!(error = %e, "results not written");
    }

    let stats = &report.outcome.stats;
    info!(
        tasks = stats.tasks_total,
        collected = stats.collected,
        final_drain = stats.collected_in_final_drain,
        elapsed_ms = stats.elapsed_ms,
        "run complete"
    );
    if out.stats_json {
        println!("{}", stats.to_json()?);
    }
    Ok(())
}
