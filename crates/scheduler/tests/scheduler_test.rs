//! End-to-end tests for the task manager.
//!
//! Every test runs a real pool with short idle timings and polls with a
//! deadline instead of sleeping for fixed periods.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use taskhive_scheduler::{
    Priority, SchedulerConfig, SubmitError, Task, TaskManager, TaskStatus,
};

const DEADLINE: Duration = Duration::from_secs(10);

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        worker_inactive_timeout_ms: 20,
        worker_sleep_ms: 1,
        ..SchedulerConfig::default()
    }
}

fn start(workers: usize) -> TaskManager {
    let mut manager = TaskManager::new(fast_config());
    manager.create(workers).unwrap();
    manager
}

/// Call `update` until `done` holds or the deadline passes.
fn pump_until(manager: &TaskManager, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + DEADLINE;
    while Instant::now() < end {
        manager.update();
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

/// Poll without draining deferred handlers.
fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + DEADLINE;
    while Instant::now() < end {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn finished<T: Send + 'static>(task: &Task<T>) -> impl FnMut() -> bool + '_ {
    move || task.status().is_finished()
}

#[test]
fn deferred_handlers_drain_highest_priority_first() {
    let manager = start(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<Task<&'static str>> = [
        ("low", Priority::LOW),
        ("high", Priority::HIGH),
        ("medium", Priority::MEDIUM),
    ]
    .into_iter()
    .map(|(label, priority)| {
        let task = manager.create_task::<&'static str>();
        task.set_priority(priority);
        task.set_callback_on_update(true);
        task.set_body(move || Ok(label));
        let sink = Arc::clone(&order);
        task.set_handler(move |label| {
            sink.lock().unwrap().push(*label);
            Ok(())
        });
        manager.submit(&task).unwrap();
        task
    })
    .collect();

    assert!(wait_until(|| manager.metrics().deferred == 3));
    assert_eq!(manager.update(), 3);

    assert_eq!(*order.lock().unwrap(), vec!["high", "medium", "low"]);
    for task in &tasks {
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(!task.is_locked());
    }
}

#[test]
fn failing_body_reports_its_message() {
    let manager = start(1);
    let task = manager.create_task::<()>();
    task.set_body(|| anyhow::bail!("boom"));
    manager.submit(&task).unwrap();

    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Error);
    assert!(task.error().unwrap().contains("boom"));
    assert!(!task.is_locked());
    assert_eq!(manager.metrics().tasks_failed, 1);
}

#[test]
fn panicking_handler_is_captured() {
    let manager = start(1);
    let task = manager.create_task::<u32>();
    task.set_body(|| Ok(7));
    task.set_handler(|value| panic!("handler saw {value}"));
    manager.submit(&task).unwrap();

    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Error);
    let message = task.error().unwrap();
    assert!(message.contains("panicked"), "{message}");
    assert!(message.contains("handler saw 7"), "{message}");

    // The worker survived and keeps serving.
    let next = manager.create_task::<()>();
    next.set_body(|| Ok(()));
    manager.submit(&next).unwrap();
    assert!(pump_until(&manager, finished(&next)));
    assert_eq!(next.status(), TaskStatus::Completed);
}

#[test]
fn completed_task_can_be_reconfigured_and_resubmitted() {
    let manager = start(2);
    let runs = Arc::new(AtomicUsize::new(0));
    let task = manager.create_task::<usize>();
    let counter = Arc::clone(&runs);
    task.set_body(move || Ok(counter.fetch_add(1, Ordering::SeqCst) + 1));
    manager.submit(&task).unwrap();
    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Completed);
    let id = task.id();

    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    assert!(task.set_priority(Priority::HIGH));
    assert!(task.set_handler(move |run| {
        sink.store(*run, Ordering::SeqCst);
        Ok(())
    }));
    manager.submit(&task).unwrap();
    assert!(pump_until(&manager, finished(&task)));

    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.id(), id);
    assert_eq!(task.priority(), Priority::HIGH);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_task_succeeds_on_resubmission() {
    let manager = start(1);
    let attempts = Arc::new(AtomicUsize::new(0));
    let task = manager.create_task::<()>();
    let counter = Arc::clone(&attempts);
    task.set_body(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("first attempt fails");
        }
        Ok(())
    });

    manager.submit(&task).unwrap();
    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Error);

    manager.submit(&task).unwrap();
    assert!(task.error().is_none());
    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn locked_task_rejects_configuration_and_resubmission() {
    let manager = start(1);
    let release = Arc::new(Mutex::new(()));
    let gate = release.lock().unwrap();

    let task = manager.create_task::<()>();
    let blocker = Arc::clone(&release);
    task.set_body(move || {
        drop(blocker.lock().unwrap());
        Ok(())
    });
    manager.submit(&task).unwrap();

    assert!(task.is_locked());
    assert!(!task.set_priority(Priority::HIGH));
    assert!(!task.set_callback_on_update(true));
    assert!(matches!(manager.submit(&task), Err(SubmitError::InvalidState(_))));

    drop(gate);
    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.priority(), Priority::LOW);
}

#[test]
fn task_without_body_is_refused() {
    let manager = start(1);
    let task = manager.create_task::<u8>();
    assert_eq!(manager.submit(&task), Err(SubmitError::MissingBody));
    assert_eq!(task.status(), TaskStatus::Setup);
    assert_eq!(manager.metrics().tasks_submitted, 0);
}

#[test]
fn excess_tasks_queue_until_a_worker_frees_up() {
    let manager = start(2);
    let handled = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<Task<u64>> = (0..25u64)
        .map(|n| {
            let task = manager.create_task::<u64>();
            task.set_body(move || Ok(n * n));
            let sink = Arc::clone(&handled);
            task.set_handler(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            manager.submit(&task).unwrap();
            task
        })
        .collect();

    assert!(pump_until(&manager, || tasks.iter().all(|t| t.status().is_finished())));
    assert!(tasks.iter().all(|t| t.status() == TaskStatus::Completed));
    assert_eq!(handled.load(Ordering::SeqCst), 25);

    let metrics = manager.metrics();
    assert_eq!(metrics.tasks_submitted, 25);
    assert_eq!(metrics.tasks_completed, 25);
    assert_eq!(metrics.outstanding(), 0);
    assert!(metrics.last_completed_at.is_some());
}

#[test]
fn update_drains_at_most_the_configured_batch() {
    let mut manager = TaskManager::new(SchedulerConfig {
        max_callbacks_per_update: 2,
        ..fast_config()
    });
    manager.create(3).unwrap();

    let tasks: Vec<Task<()>> = (0..5)
        .map(|_| {
            let task = manager.create_task::<()>();
            task.set_callback_on_update(true);
            task.set_body(|| Ok(()));
            manager.submit(&task).unwrap();
            task
        })
        .collect();

    assert!(wait_until(|| manager.metrics().deferred == 5));
    assert_eq!(manager.update(), 2);
    assert_eq!(manager.metrics().deferred, 3);
    assert_eq!(manager.update(), 2);
    assert_eq!(manager.update(), 1);
    assert_eq!(manager.update(), 0);
    assert!(tasks.iter().all(|t| t.status() == TaskStatus::Completed));
}

#[test]
fn handlers_run_on_the_expected_threads() {
    let manager = start(2);
    let caller = thread::current().id();
    let deferred_on: Arc<Mutex<Option<ThreadId>>> = Arc::default();
    let inline_on: Arc<Mutex<Option<ThreadId>>> = Arc::default();

    let deferred = manager.create_task::<()>();
    deferred.set_callback_on_update(true);
    deferred.set_body(|| Ok(()));
    let sink = Arc::clone(&deferred_on);
    deferred.set_handler(move |_| {
        *sink.lock().unwrap() = Some(thread::current().id());
        Ok(())
    });

    let inline = manager.create_task::<()>();
    inline.set_body(|| Ok(()));
    let sink = Arc::clone(&inline_on);
    inline.set_handler(move |_| {
        *sink.lock().unwrap() = Some(thread::current().id());
        Ok(())
    });

    manager.submit(&inline).unwrap();
    assert!(wait_until(finished(&inline)));
    assert_eq!(manager.update(), 0);

    manager.submit(&deferred).unwrap();
    assert!(wait_until(|| deferred.status() == TaskStatus::CallbackOnUpdate));
    assert!(deferred.is_locked());
    assert!(deferred_on.lock().unwrap().is_none());
    assert!(pump_until(&manager, finished(&deferred)));

    assert_eq!(*deferred_on.lock().unwrap(), Some(caller));
    let worker = inline_on.lock().unwrap().unwrap();
    assert_ne!(worker, caller);
    assert_eq!(manager.metrics().callbacks_drained, 1);
}

#[test]
fn destroy_twice_then_submit_is_refused() {
    let mut manager = start(2);
    manager.destroy();
    manager.destroy();
    assert!(!manager.is_running());

    let task = manager.create_task::<()>();
    task.set_body(|| Ok(()));
    assert_eq!(manager.submit(&task), Err(SubmitError::NotRunning));

    manager.create(1).unwrap();
    manager.submit(&task).unwrap();
    assert!(pump_until(&manager, finished(&task)));
    assert_eq!(task.status(), TaskStatus::Completed);
}

#[test]
fn destroy_abandons_queued_work_and_finishes_running_work() {
    let mut manager = start(1);

    let (release, gate) = mpsc::channel::<()>();
    let blocker = manager.create_task::<()>();
    blocker.set_body(move || {
        let _ = gate.recv();
        Ok(())
    });
    manager.submit(&blocker).unwrap();
    assert!(wait_until(|| blocker.status() == TaskStatus::InProgress));

    let ran = Arc::new(AtomicBool::new(false));
    let queued = manager.create_task::<()>();
    let flag = Arc::clone(&ran);
    queued.set_body(move || {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    manager.submit(&queued).unwrap();
    assert_eq!(queued.status(), TaskStatus::Pending);

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let _ = release.send(());
    });
    manager.destroy();
    releaser.join().unwrap();

    assert_eq!(blocker.status(), TaskStatus::Completed);
    assert!(!blocker.is_locked());
    assert_eq!(queued.status(), TaskStatus::Pending);
    assert!(queued.is_locked());
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(manager.metrics().pending, 0);

    // The abandoned task stays locked, even for a fresh pool.
    manager.create(1).unwrap();
    assert_eq!(
        manager.submit(&queued),
        Err(SubmitError::InvalidState(TaskStatus::Pending))
    );
    assert!(!queued.set_priority(Priority::HIGH));
}

#[test]
fn task_handle_outlives_its_manager() {
    let task = {
        let manager = start(1);
        let task = manager.create_task::<String>();
        task.set_body(|| Ok("done".to_string()));
        manager.submit(&task).unwrap();
        assert!(pump_until(&manager, finished(&task)));
        task
    };

    assert_eq!(task.status(), TaskStatus::Completed);
    assert!(!task.is_locked());
    assert!(task.set_priority(Priority::MEDIUM));
}

#[test]
fn managers_are_independent() {
    let first = start(1);
    let second = start(1);

    assert_eq!(first.create_task::<()>().id(), 1);
    assert_eq!(second.create_task::<()>().id(), 1);

    let task = second.create_task::<()>();
    task.set_body(|| Ok(()));
    second.submit(&task).unwrap();
    assert!(pump_until(&second, finished(&task)));
    assert_eq!(first.metrics().tasks_submitted, 0);
    assert_eq!(second.metrics().tasks_completed, 1);
}

#[test]
fn metrics_count_a_task_as_soon_as_it_finishes() {
    let manager = start(1);
    for round in 1..=50u64 {
        let task = manager.create_task::<u64>();
        task.set_body(move || Ok(round));
        manager.submit(&task).unwrap();

        let end = Instant::now() + DEADLINE;
        while !task.status().is_finished() {
            assert!(Instant::now() < end, "task {round} never finished");
            thread::yield_now();
        }
        assert_eq!(manager.metrics().tasks_completed, round);
    }
}

#[test]
fn metrics_serialize_for_reporting() {
    let manager = start(1);
    let json = serde_json::to_value(manager.metrics()).unwrap();
    assert_eq!(json["workers"], 1);
    assert_eq!(json["pending"], 0);
}
