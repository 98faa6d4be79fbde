use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::debug;

use crate::sync::{lock, try_lock};
use crate::task::Outcome;
use crate::worker::{Assignment, IdlePolicy, Slot};

use super::core::Shared;

/// Organizer thread body: route tasks until the manager stops running.
pub(super) fn run(shared: &Shared, slots: &[Slot], policy: IdlePolicy) {
    debug!(workers = slots.len(), "organizer started");
    let mut last_change = Instant::now();

    while shared.running.load(Ordering::Acquire) {
        if organize_pass(shared, slots) > 0 {
            last_change = Instant::now();
        } else {
            policy.idle(last_change.elapsed());
        }
    }

    debug!("organizer stopped");
}

/// One sweep over the worker slots under the queue lock. Busy slots are
/// skipped rather than waited on. Returns how many slots changed.
pub(super) fn organize_pass(shared: &Shared, slots: &[Slot]) -> usize {
    let mut queues = lock(&shared.queues);
    let mut changed = 0;

    for slot in slots {
        let Some(mut guard) = try_lock(slot) else {
            continue;
        };

        if let Some(outcome) = guard.as_ref().and_then(|assignment| assignment.outcome) {
            if let Some(assignment) = guard.take() {
                if outcome == Outcome::Deferred {
                    debug!(task = assignment.job.id(), "handler deferred to update");
                    queues.deferred.push(assignment.job);
                }
                changed += 1;
            }
        }

        if guard.is_none() {
            if let Some(job) = queues.pending.pop() {
                debug!(task = job.id(), priority = %job.priority(), "task dispatched");
                *guard = Some(Assignment::new(job));
                changed += 1;
            }
        }
    }

    changed
}
