use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::task::{Job, Priority};

struct Entry {
    priority: Priority,
    seq: u64,
    job: Arc<dyn Job>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Max-heap: higher priority first, then the earlier arrival.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of jobs. Equal priorities leave in arrival order.
///
/// The priority is captured on push; tasks are locked while queued, so it
/// cannot change underneath the heap.
#[derive(Default)]
pub(crate) struct JobQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl JobQueue {
    pub(crate) fn push(&mut self, job: Arc<dyn Job>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority: job.priority(),
            seq,
            job,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<Arc<dyn Job>> {
        self.heap.pop().map(|entry| entry.job)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drop every queued job, returning how many were discarded.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
}
