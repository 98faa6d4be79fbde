mod cli;
mod demos;
mod vectors;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use taskhive_scheduler::{load_dotenv, SchedulerConfig, TaskManager};

use crate::cli::{CliArgs, Command};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    // Load config: file when given, otherwise defaults plus TASKHIVE_* env vars
    let config = match &args.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let config = SchedulerConfig::from_env();
            config.validate().context("invalid scheduler environment")?;
            config
        }
    };
    config.log_summary();

    let mut manager = TaskManager::new(config);
    match args.command {
        Command::Normalize {
            workers,
            tasks,
            vectors,
        } => demos::normalize(&mut manager, usize::from(workers), tasks, vectors)?,
        Command::Reuse {
            iterations,
            count_to,
        } => demos::reuse(&mut manager, iterations, count_to)?,
        Command::Errors {
            message,
            rounds,
            min_delay_ms,
            max_delay_ms,
        } => demos::errors(&mut manager, message, rounds, min_delay_ms, max_delay_ms)?,
    }

    let metrics = manager.metrics();
    manager.destroy();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        info!(
            submitted = metrics.tasks_submitted,
            completed = metrics.tasks_completed,
            failed = metrics.tasks_failed,
            drained = metrics.callbacks_drained,
            "demo finished"
        );
    }
    Ok(())
}
