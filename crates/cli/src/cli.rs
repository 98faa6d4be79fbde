use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Demo workloads for the taskhive scheduler.
///
/// Each subcommand creates a pool, drives it from the main thread through
/// `update`, then destroys it and reports metrics.
#[derive(Parser, Debug)]
#[command(name = "taskhive-demo", about = "Demo workloads for the taskhive scheduler")]
pub struct CliArgs {
    /// TOML scheduler config (idle timings, callbacks per update)
    #[arg(long, env = "TASKHIVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print final scheduler metrics as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalise batches of random 3-vectors on the pool, reporting on the main thread
    Normalize {
        /// Worker threads to create (32 maximum)
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=32))]
        workers: u16,

        /// Tasks to submit
        #[arg(long, default_value = "4")]
        tasks: usize,

        /// Vectors generated and normalised per task
        #[arg(long, default_value = "3000000")]
        vectors: usize,
    },

    /// Resubmit one task object repeatedly, reusing its id
    Reuse {
        /// Times the task is submitted
        #[arg(long, default_value = "3")]
        iterations: usize,

        /// Value the task counts up to on each run
        #[arg(long, default_value = "100000000")]
        count_to: u64,
    },

    /// Watch a task fail in its body, then in its handler, and resubmit it
    Errors {
        /// Message carried by every failure
        #[arg(long, default_value = "something went wrong")]
        message: String,

        /// Submissions to run
        #[arg(long, default_value = "2")]
        rounds: usize,

        /// Shortest simulated work time in milliseconds
        #[arg(long, default_value = "2000")]
        min_delay_ms: u64,

        /// Longest simulated work time in milliseconds
        #[arg(long, default_value = "5000")]
        max_delay_ms: u64,
    },
}
