//! The ordered record of submitted jobs.
//!
//! Every submitted job is appended here with a monotonically increasing
//! sequence number and handed to the worker in the same critical section,
//! so the worker's inbox always matches queue order. Entries are removed
//! only once their job has been durably handled or definitively dropped:
//! a single handled entry via [`JobQueue::remove`], or a whole start block
//! via [`JobQueue::drain_through`]. Jobs held back because the device is
//! not yet registered stay in the record so a later start request can fold
//! them through replay.

use crate::worker::Command;
use std::collections::VecDeque;
use std::sync::Mutex;
use sync_types::SyncJob;
use tokio::sync::mpsc;

/// A job stamped with its position in the submission order.
#[derive(Debug, Clone)]
pub(crate) struct QueuedJob {
    /// Submission sequence number; lower means earlier.
    pub seq: u64,
    /// The job itself.
    pub job: SyncJob,
}

#[derive(Debug, Default)]
struct JobQueueInner {
    next_seq: u64,
    entries: VecDeque<QueuedJob>,
}

/// Mutex-guarded FIFO record of pending jobs, feeding the worker inbox.
pub(crate) struct JobQueue {
    inner: Mutex<JobQueueInner>,
    tx: mpsc::UnboundedSender<Command>,
}

impl JobQueue {
    /// Create a queue that forwards entries to the given worker inbox.
    pub fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            inner: Mutex::new(JobQueueInner::default()),
            tx,
        }
    }

    /// Append a job and hand it to the worker, as one atomic step.
    ///
    /// The inbox send happens under the same lock that assigns the
    /// sequence number: two concurrent submitters cannot reach the worker
    /// in an order different from their queue positions. Never blocks
    /// beyond the internal lock.
    pub fn push(&self, job: SyncJob) {
        let mut inner = self.lock();
        let entry = QueuedJob {
            seq: inner.next_seq,
            job,
        };
        inner.next_seq += 1;
        inner.entries.push_back(entry.clone());
        if self.tx.send(Command::Process(entry)).is_err() {
            // Only possible once the worker has stopped; the entry stays
            // in the record for diagnosis.
            tracing::warn!("job submitted after the worker stopped");
        }
    }

    /// Snapshot of the jobs queued strictly before `seq`, in order.
    ///
    /// This is the replay input for the start request at `seq`.
    pub fn jobs_before(&self, seq: u64) -> Vec<SyncJob> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.seq < seq)
            .map(|entry| entry.job.clone())
            .collect()
    }

    /// Remove every entry up to and including `seq`.
    pub fn drain_through(&self, seq: u64) {
        let mut inner = self.lock();
        while let Some(front) = inner.entries.front() {
            if front.seq > seq {
                break;
            }
            inner.entries.pop_front();
        }
    }

    /// Remove the single entry with the given sequence number.
    pub fn remove(&self, seq: u64) {
        self.lock().entries.retain(|entry| entry.seq != seq);
    }

    /// Number of entries still in the record.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobQueueInner> {
        self.inner.lock().expect("job queue lock poisoned")
    }
}
