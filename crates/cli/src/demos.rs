//! Interactive demo workloads, driven by counts instead of key presses.

use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use rand::Rng;
use tracing::{debug, info};

use taskhive_scheduler::{Task, TaskManager};

use crate::vectors::{self, NormalizeReport};

/// Main-thread pacing between `update` calls.
const TICK: Duration = Duration::from_millis(100);

/// Pump deferred handlers on this thread until `done` holds.
fn drive(manager: &TaskManager, mut done: impl FnMut() -> bool) {
    while !done() {
        let drained = manager.update();
        if drained > 0 {
            debug!(drained, "handlers drained");
        }
        thread::sleep(TICK);
    }
    manager.update();
}

pub fn normalize(
    manager: &mut TaskManager,
    workers: usize,
    tasks: usize,
    vector_count: usize,
) -> Result<()> {
    manager.create(workers).context("failed to create the task manager")?;
    info!(workers, tasks, vectors = vector_count, "normalise demo started");

    let mut handles: Vec<Task<NormalizeReport>> = Vec::with_capacity(tasks);
    for _ in 0..tasks {
        let task = manager.create_task::<NormalizeReport>();
        let id = task.id();
        task.set_callback_on_update(true);
        task.set_body(move || {
            Ok(vectors::normalize_random(vector_count, &mut rand::thread_rng()))
        });
        task.set_handler(move |report| {
            println!(
                "task {id}: normalised {} of {} vectors exactly; average inexact magnitude {:.7}",
                report.exact, report.total, report.average_inexact
            );
            Ok(())
        });
        manager.submit(&task).context("failed to submit normalise task")?;
        println!("Added task {id} to the manager. Processing...");
        handles.push(task);
    }

    drive(manager, || handles.iter().all(|task| task.status().is_finished()));
    for task in &handles {
        if let Some(error) = task.error() {
            println!("task {} failed: {error}", task.id());
        }
    }
    Ok(())
}

fn count_up(limit: u64) -> u64 {
    let mut sum = 0u64;
    for _ in 0..limit {
        sum = black_box(sum + 1);
    }
    sum
}

pub fn reuse(manager: &mut TaskManager, iterations: usize, count_to: u64) -> Result<()> {
    manager.create(1).context("failed to create the task manager")?;

    let task = manager.create_task::<u64>();
    task.set_callback_on_update(true);
    task.set_body(move || Ok(count_up(count_to)));
    task.set_handler(|total| {
        println!("Counted to: {total}");
        Ok(())
    });

    for run in 1..=iterations {
        manager.submit(&task).context("failed to resubmit the reusable task")?;
        println!("Run {run}/{iterations}: task {} counting to {count_to}", task.id());
        drive(manager, || task.status().is_finished());
        if let Some(error) = task.error() {
            println!("Run {run} failed: {error}");
        }
    }
    Ok(())
}

pub fn errors(
    manager: &mut TaskManager,
    message: String,
    rounds: usize,
    min_delay_ms: u64,
    max_delay_ms: u64,
) -> Result<()> {
    ensure!(
        min_delay_ms <= max_delay_ms,
        "--min-delay-ms ({min_delay_ms}) must not exceed --max-delay-ms ({max_delay_ms})"
    );
    manager.create(1).context("failed to create the task manager")?;

    let message: Arc<str> = Arc::from(message);
    // Set once the body has failed, so the next run gets through to the handler.
    let body_failed = Arc::new(AtomicBool::new(false));

    let task = manager.create_task::<()>();
    task.set_body({
        let message = Arc::clone(&message);
        let body_failed = Arc::clone(&body_failed);
        move || {
            let delay = rand::thread_rng().gen_range(min_delay_ms..=max_delay_ms);
            thread::sleep(Duration::from_millis(delay));
            if !body_failed.swap(true, Ordering::SeqCst) {
                anyhow::bail!("task body failed: {message}");
            }
            Ok(())
        }
    });
    task.set_handler({
        let message = Arc::clone(&message);
        move |_| {
            body_failed.store(false, Ordering::SeqCst);
            anyhow::bail!("task handler failed: {message}")
        }
    });

    let mut last = task.status();
    println!("Task status: {last}");
    for _ in 0..rounds {
        manager.submit(&task).context("failed to submit the failing task")?;
        drive(manager, || {
            let now = task.status();
            if now != last {
                last = now;
                println!("Task status: {now}");
            }
            now.is_finished()
        });
        if let Some(error) = task.error() {
            println!("{error}\n");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use taskhive_scheduler::SchedulerConfig;

    use super::*;

    fn quiet_manager() -> TaskManager {
        TaskManager::new(SchedulerConfig {
            worker_inactive_timeout_ms: 10,
            worker_sleep_ms: 1,
            ..SchedulerConfig::default()
        })
    }

    #[test]
    fn count_up_reaches_the_limit() {
        assert_eq!(count_up(0), 0);
        assert_eq!(count_up(12_345), 12_345);
    }

    #[test]
    fn normalize_demo_completes() {
        let mut manager = quiet_manager();
        normalize(&mut manager, 2, 3, 1_000).unwrap();

        let metrics = manager.metrics();
        assert_eq!(metrics.tasks_completed, 3);
        assert_eq!(metrics.callbacks_drained, 3);
    }

    #[test]
    fn reuse_demo_keeps_one_task() {
        let mut manager = quiet_manager();
        reuse(&mut manager, 3, 1_000).unwrap();

        let metrics = manager.metrics();
        assert_eq!(metrics.tasks_submitted, 3);
        assert_eq!(metrics.tasks_completed, 3);
        assert_eq!(manager.create_task::<()>().id(), 2);
    }

    #[test]
    fn errors_demo_alternates_failure_points() {
        let mut manager = quiet_manager();
        errors(&mut manager, "kaput".to_string(), 2, 0, 1).unwrap();

        let metrics = manager.metrics();
        assert_eq!(metrics.tasks_failed, 2);
        assert_eq!(metrics.tasks_completed, 0);
    }

    #[test]
    fn errors_demo_rejects_inverted_delays() {
        let mut manager = quiet_manager();
        assert!(errors(&mut manager, "x".to_string(), 1, 10, 1).is_err());
        assert!(!manager.is_running());
    }
}
