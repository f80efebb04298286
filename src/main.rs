//! Ghostcrawl main entry point
//!
//! This is the command-line interface for submitting scrape, crawl and map
//! jobs, polling their status, and running workers.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ghostcrawl::config::{load_config_or_default, Config};
use ghostcrawl::crawler::{spawn_workers, Worker};
use ghostcrawl::storage::{open_storage, SqliteStorage};
use ghostcrawl::Submitter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Ghostcrawl: on-demand scraping, bounded crawling and link mapping
///
/// Submissions return immediately with a job id; workers sharing the same
/// database process the jobs.
#[derive(Parser, Debug)]
#[command(name = "ghostcrawl")]
#[command(version)]
#[command(about = "On-demand scraping, bounded crawling and link mapping", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single page with full extraction
    Scrape {
        url: String,
    },

    /// Crawl same-host links from a seed, bounded by depth and page count
    Crawl {
        url: String,

        #[arg(long)]
        max_depth: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Map the links of a whole host
    Map {
        url: String,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show state, result and error of a job
    Status {
        job_id: String,
    },

    /// Run workers against the shared queue
    Worker {
        /// Number of workers (overrides the configuration)
        #[arg(long)]
        concurrency: Option<u32>,

        /// Exit once no job is pending or active
        #[arg(long)]
        until_idle: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "invalid default configuration".to_string(),
        }
    })?;

    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;
    let storage = Arc::new(storage);
    let submitter = Submitter::new(storage.clone(), config.limits.clone());

    match cli.command {
        Command::Scrape { url } => print_json(&submitter.submit_scrape(&url)?)?,
        Command::Crawl {
            url,
            max_depth,
            limit,
        } => print_json(&submitter.submit_crawl(&url, max_depth, limit)?)?,
        Command::Map { url, limit } => print_json(&submitter.submit_map(&url, limit)?)?,
        Command::Status { job_id } => match submitter.get_job_status(&job_id)? {
            Some(status) => print_json(&status)?,
            None => bail!("job {} not found", job_id),
        },
        Command::Worker {
            concurrency,
            until_idle,
        } => {
            if let Some(concurrency) = concurrency {
                config.worker.concurrency = concurrency;
            }
            ghostcrawl::config::validate(&config)?;

            if until_idle {
                handle_until_idle(&config, storage).await?;
            } else {
                handle_workers(&config, storage).await?;
            }
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ghostcrawl=info,warn"),
            1 => EnvFilter::new("ghostcrawl=debug,info"),
            2 => EnvFilter::new("ghostcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs workers until Ctrl-C
async fn handle_workers(config: &Config, storage: Arc<SqliteStorage>) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(config, storage, shutdown_rx);
    tracing::info!("{} workers running, press Ctrl-C to stop", handles.len());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down workers");
    shutdown_tx.send(true)?;

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

/// Runs workers until the queue is drained
async fn handle_until_idle(config: &Config, storage: Arc<SqliteStorage>) -> anyhow::Result<()> {
    let handles: Vec<_> = (0..config.worker.concurrency as usize)
        .map(|id| {
            let mut worker = Worker::from_config(id, config, Arc::clone(&storage));
            tokio::spawn(async move { worker.run_until_idle().await })
        })
        .collect();

    let mut processed = 0;
    for handle in handles {
        processed += handle.await??;
    }

    tracing::info!("Queue drained: {} jobs processed", processed);
    Ok(())
}
