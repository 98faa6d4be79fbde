use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::metrics::{Counters, SchedulerMetrics};
use crate::queue::JobQueue;
use crate::sync::lock;
use crate::task::{Task, TaskId};
use crate::worker::{IdlePolicy, Slot, Worker};

use super::organizer;

#[derive(Default)]
pub(super) struct Queues {
    /// Submitted tasks waiting for a free worker.
    pub(super) pending: JobQueue,
    /// Tasks whose body finished and whose handler waits for `update`.
    pub(super) deferred: JobQueue,
}

/// State reachable from the organizer thread.
#[derive(Default)]
pub(super) struct Shared {
    pub(super) queues: Mutex<Queues>,
    pub(super) running: AtomicBool,
    pub(super) counters: Arc<Counters>,
}

struct Pool {
    workers: Vec<Worker>,
    organizer: JoinHandle<()>,
    /// Idle timings fixed when the pool was created.
    policy: IdlePolicy,
}

/// Owner of a worker pool and the queues feeding it.
///
/// Several managers may coexist; each has its own threads, queues and id
/// sequence. Dropping a manager destroys its pool.
pub struct TaskManager {
    pub(super) shared: Arc<Shared>,
    next_id: AtomicU64,
    default_workers: usize,
    worker_timeout_ms: AtomicU64,
    worker_sleep_ms: AtomicU64,
    pub(super) max_callbacks: AtomicUsize,
    /// Thread allowed to call `update`, bound by the first call.
    pub(super) designated: Mutex<Option<ThreadId>>,
    pool: Option<Pool>,
}

impl TaskManager {
    /// Create a manager with the given tunables. No threads start until
    /// [`create`](Self::create).
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            next_id: AtomicU64::new(1),
            default_workers: config.worker_count,
            worker_timeout_ms: AtomicU64::new(config.worker_inactive_timeout_ms),
            worker_sleep_ms: AtomicU64::new(config.worker_sleep_ms),
            max_callbacks: AtomicUsize::new(config.max_callbacks_per_update.max(1)),
            designated: Mutex::new(None),
            pool: None,
        }
    }

    /// Start `worker_count` workers and the organizer.
    ///
    /// On a spawn failure every thread already started is joined before the
    /// error is returned, leaving the manager not created.
    pub fn create(&mut self, worker_count: usize) -> Result<(), SchedulerError> {
        if self.pool.is_some() {
            return Err(SchedulerError::AlreadyCreated);
        }
        if worker_count == 0 {
            return Err(SchedulerError::ZeroWorkers);
        }

        let policy = IdlePolicy {
            inactive_timeout: self.worker_timeout(),
            sleep_length: self.worker_sleep(),
        };

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker = Worker::spawn(index, policy, Arc::clone(&self.shared.counters))
                .map_err(|source| SchedulerError::Spawn {
                    role: format!("worker {index}"),
                    source,
                })?;
            workers.push(worker);
        }

        let slots: Vec<Slot> = workers.iter().map(Worker::slot).collect();
        self.shared.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("taskhive-organizer".to_string())
            .spawn({
                let shared = Arc::clone(&self.shared);
                move || organizer::run(&shared, &slots, policy)
            });
        let organizer = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(SchedulerError::Spawn {
                    role: "organizer".to_string(),
                    source,
                });
            }
        };

        self.pool = Some(Pool {
            workers,
            organizer,
            policy,
        });
        info!(
            workers = worker_count,
            inactive_timeout_ms = millis(policy.inactive_timeout),
            sleep_ms = millis(policy.sleep_length),
            "task manager created"
        );
        Ok(())
    }

    /// [`create`](Self::create) with the configured default worker count.
    pub fn create_default(&mut self) -> Result<(), SchedulerError> {
        self.create(self.default_workers)
    }

    /// Stop and join every thread. No-op when not created.
    ///
    /// Queued and in-flight tasks are abandoned: they stay locked in the
    /// status they had and are never run. The manager may be created again.
    pub fn destroy(&mut self) {
        let Some(Pool {
            mut workers,
            organizer,
            policy,
        }) = self.pool.take()
        else {
            return;
        };

        self.shared.running.store(false, Ordering::Release);
        if organizer.join().is_err() {
            error!("organizer thread panicked");
        }
        for worker in &mut workers {
            worker.stop();
        }

        let (pending, deferred) = {
            let mut queues = lock(&self.shared.queues);
            (queues.pending.clear(), queues.deferred.clear())
        };
        if pending + deferred > 0 {
            warn!(pending, deferred, "abandoned queued tasks on destroy");
        }
        *lock(&self.designated) = None;
        info!(
            workers = workers.len(),
            inactive_timeout_ms = millis(policy.inactive_timeout),
            "task manager destroyed"
        );
    }

    /// New task in `Setup` with the next id from this manager.
    pub fn create_task<T: Send + 'static>(&self) -> Task<T> {
        let id: TaskId = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(task = id, "task created");
        Task::new(id)
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    /// Threads in the current pool, 0 when not created.
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.workers.len())
    }

    /// Applies to pools created after the call.
    pub fn set_worker_timeout(&self, timeout: Duration) {
        self.worker_timeout_ms.store(millis(timeout), Ordering::Relaxed);
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms.load(Ordering::Relaxed))
    }

    /// Applies to pools created after the call.
    pub fn set_worker_sleep(&self, sleep: Duration) {
        self.worker_sleep_ms.store(millis(sleep), Ordering::Relaxed);
    }

    pub fn worker_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_sleep_ms.load(Ordering::Relaxed))
    }

    /// Handlers drained per `update` call. Values below 1 are raised to 1.
    pub fn set_max_callbacks(&self, max: usize) {
        self.max_callbacks.store(max.max(1), Ordering::Relaxed);
    }

    pub fn max_callbacks(&self) -> usize {
        self.max_callbacks.load(Ordering::Relaxed)
    }

    /// Idle timings of the running pool.
    #[cfg(test)]
    pub(super) fn idle_policy(&self) -> Option<IdlePolicy> {
        self.pool.as_ref().map(|pool| pool.policy)
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        let queues = lock(&self.shared.queues);
        self.shared.counters.snapshot(
            self.worker_count(),
            queues.pending.len(),
            queues.deferred.len(),
        )
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.destroy();
    }
}
