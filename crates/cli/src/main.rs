mod config;
mod heartbeat;
mod worker;

use anyhow::{Context, Result};
use backend::{BackendClient, HttpBackend, LogBackend};
use clap::{Parser, Subcommand};
use events::EventBus;
use orchestrator::{DefaultServiceFactory, TaskDispatcher};
use press_core::{EntryMode, TaskDescriptor, WorkerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Overrides;
use crate::worker::{setup_signal_handler, WorkerLoop};

#[derive(Parser)]
#[command(name = "press-worker")]
#[command(about = "Turns content tasks into git and static site operations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (default: ./press-worker.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    workspace_root: Option<PathBuf>,

    #[arg(long, global = true)]
    generator_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    template_dir: Option<PathBuf>,

    /// Which task methods to accept: site, post or all
    #[arg(long, global = true)]
    entry_mode: Option<EntryMode>,

    #[arg(long, global = true)]
    backend_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend for tasks
    Worker {
        /// Process at most one task, then exit
        #[arg(long)]
        once: bool,
    },
    /// Run a single task descriptor from a JSON file, reporting to the log
    Run {
        #[arg(short, long)]
        task: PathBuf,
    },
    /// Print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = Overrides {
        workspace_root: cli.workspace_root.clone(),
        generator_dir: cli.generator_dir.clone(),
        template_dir: cli.template_dir.clone(),
        entry_mode: cli.entry_mode,
        backend_url: cli.backend_url.clone(),
    };
    let config = config::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Worker { once } => run_worker(config, once).await,
        Commands::Run { task } => run_task_file(config, &task).await,
        Commands::CheckConfig => {
            print!("{}", config::render_redacted(&config)?);
            Ok(())
        }
    }
}

async fn run_worker(config: WorkerConfig, once: bool) -> Result<()> {
    let backend: Arc<dyn BackendClient> = Arc::new(HttpBackend::new(&config.backend));
    tracing::info!(backend = %config.backend.url, worker_id = %config.backend.worker_id, "Connecting to backend");

    let poll_interval = config.poll_interval();
    let heartbeat_interval = config.heartbeat_interval();
    let worker_id = config.backend.worker_id.clone();

    let event_bus = EventBus::new();
    log_events(&event_bus);

    let dispatcher = TaskDispatcher::new(config, Arc::new(DefaultServiceFactory), backend.clone())
        .with_event_bus(event_bus.clone());
    let worker = WorkerLoop::new(dispatcher, backend.clone(), poll_interval);

    if once {
        let processed = worker.process_one_task().await?;
        if !processed {
            tracing::info!("No pending task");
        }
        return Ok(());
    }

    let shutdown = worker.shutdown_handle();
    setup_signal_handler(shutdown.clone());
    let heartbeat = heartbeat::spawn(
        backend,
        worker_id,
        heartbeat_interval,
        worker.busy_handle(),
        shutdown,
        Some(event_bus),
    );

    let result = worker.run().await;
    heartbeat.abort();
    result
}

async fn run_task_file(config: WorkerConfig, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let task = TaskDescriptor::from_json(&raw)
        .with_context(|| format!("Failed to parse task {}", path.display()))?;

    let dispatcher = TaskDispatcher::new(
        config,
        Arc::new(DefaultServiceFactory),
        Arc::new(LogBackend),
    );

    let report = dispatcher.run(&task).await?;
    if report.is_partial() {
        anyhow::bail!(
            "Task {} finished but {} post(s) failed: {}",
            report.task_id,
            report.failed_posts.len(),
            report.failed_posts.join(", ")
        );
    }
    tracing::info!(task_id = %report.task_id, steps = report.steps.len(), "Task completed");
    Ok(())
}

/// Mirror bus events into the debug log.
fn log_events(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => tracing::debug!(event = ?envelope.event, "Event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event log lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "press_worker=debug,orchestrator=debug,vcs=debug,site=debug,backend=debug"
    } else {
        "press_worker=info,orchestrator=info,vcs=info,site=info,backend=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
