//! Active-task table and cumulative transfer statistics.
//!
//! One [`TransferRegistry`] is owned per engine and injected at construction,
//! so separate engines (and tests) never share counters.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::options::TransferOptions;
use super::progress::{TransferProgress, TransferStatus};

/// Identifier of a transfer task, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Snapshot of an in-flight or paused transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferTask {
    pub id: TaskId,
    pub url: String,
    pub destination: PathBuf,
    pub progress: TransferProgress,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Registry entry: the public snapshot plus what is needed to (re)run it.
struct TaskEntry {
    task: TransferTask,
    options: TransferOptions,
    cancel: CancellationToken,
}

/// Everything the engine needs to run one attempt loop for a task.
#[derive(Clone)]
pub(crate) struct TaskJob {
    pub id: TaskId,
    pub url: String,
    pub destination: PathBuf,
    pub options: TransferOptions,
    pub cancel: CancellationToken,
}

/// Cumulative counters for a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    /// Bytes written to disk by completed transfers.
    pub bytes_transferred: u64,
    /// Attempts started, including retries.
    pub attempts: u64,
    /// Transfers that completed successfully.
    pub completed: u64,
    /// Transfers that exhausted their attempts.
    pub failed: u64,
    /// Transfers cancelled by the caller.
    pub cancelled: u64,
    /// Tasks currently in the active set.
    pub active: u64,
}

/// Table of active transfer tasks with cumulative statistics.
#[derive(Default)]
pub struct TransferRegistry {
    tasks: DashMap<TaskId, TaskEntry>,
    next_id: AtomicU64,
    bytes_transferred: AtomicU64,
    attempts: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRegistry")
            .field("active", &self.tasks.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl TransferRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pending task to the active set.
    pub(crate) fn register(
        &self,
        url: &str,
        destination: PathBuf,
        options: TransferOptions,
    ) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let task = TransferTask {
            id,
            url: url.to_string(),
            destination,
            progress: TransferProgress::default(),
            started_at: None,
            completed_at: None,
            last_error: None,
        };
        self.tasks.insert(
            id,
            TaskEntry {
                task,
                options,
                cancel: CancellationToken::new(),
            },
        );
        id
    }

    /// Get what is needed to run the task.
    pub(crate) fn job(&self, id: TaskId) -> Option<TaskJob> {
        self.tasks.get(&id).map(|entry| TaskJob {
            id,
            url: entry.task.url.clone(),
            destination: entry.task.destination.clone(),
            options: entry.options.clone(),
            cancel: entry.cancel.clone(),
        })
    }

    /// Apply `f` to a task's snapshot, returning its result if the task exists.
    ///
    /// The closure runs under the table's shard lock and must not block.
    pub(crate) fn update<R>(&self, id: TaskId, f: impl FnOnce(&mut TransferTask) -> R) -> Option<R> {
        self.tasks.get_mut(&id).map(|mut entry| f(&mut entry.task))
    }

    /// Replace a paused task's cancellation token so it can run again.
    pub(crate) fn rearm(&self, id: TaskId) -> Option<CancellationToken> {
        self.tasks.get_mut(&id).map(|mut entry| {
            entry.cancel = CancellationToken::new();
            entry.cancel.clone()
        })
    }

    /// Signal the task's cancellation token.
    pub(crate) fn signal(&self, id: TaskId) {
        if let Some(entry) = self.tasks.get(&id) {
            entry.cancel.cancel();
        }
    }

    /// Remove a task from the active set.
    pub(crate) fn remove(&self, id: TaskId) -> Option<TransferTask> {
        self.tasks.remove(&id).map(|(_, entry)| entry.task)
    }

    /// Get a snapshot of a task.
    pub fn get(&self, id: TaskId) -> Option<TransferTask> {
        self.tasks.get(&id).map(|entry| entry.task.clone())
    }

    /// Get the current status of a task.
    pub fn status(&self, id: TaskId) -> Option<TransferStatus> {
        self.tasks.get(&id).map(|entry| entry.task.progress.status)
    }

    /// Snapshots of every task in the active set, ordered by id.
    pub fn active(&self) -> Vec<TransferTask> {
        let mut tasks: Vec<_> = self.tasks.iter().map(|entry| entry.task.clone()).collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    /// Remove every task whose status is terminal. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.tasks.retain(|_, entry| {
            let terminal = entry.task.progress.status.is_terminal();
            removed += usize::from(terminal);
            !terminal
        });
        removed
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, bytes: u64) {
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the cumulative statistics.
    pub fn stats(&self) -> TransferStats {
        TransferStats {
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            active: self.tasks.len() as u64,
        }
    }

    /// Zero the cumulative counters. Active tasks are untouched.
    pub fn reset_stats(&self) {
        self.bytes_transferred.store(0, Ordering::Relaxed);
        self.attempts.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
    }
}
