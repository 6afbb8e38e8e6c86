//! Job Queue (spec §4.5).
//!
//! Three bounded, independent channels — one per topic — so a backlog on
//! one topic cannot starve another. Enqueue is non-blocking: a full buffer
//! is surfaced immediately as `QueueFull` so the caller (the coordinator,
//! on the hot path) can decide whether to compensate.

use uuid::Uuid;

use crate::models::{DatabaseSyncJob, WaitlistEntryJob};

#[derive(Debug, thiserror::Error)]
#[error("job queue is full")]
pub struct QueueFull;

#[derive(Clone)]
pub struct JobQueue {
    pub(crate) db_sync_tx: tokio::sync::mpsc::Sender<DatabaseSyncJob>,
    pub(crate) waitlist_process_tx: tokio::sync::mpsc::Sender<Uuid>,
    pub(crate) waitlist_entry_tx: tokio::sync::mpsc::Sender<WaitlistEntryJob>,
}

/// Receiving halves, handed to the worker pool at startup. Kept separate
/// from `JobQueue` because receivers aren't `Clone` — only one pool owns
/// them, wrapped per-topic in a mutex so the fixed worker fan-out can share
/// a single channel per topic (spec §4.5 "fixed worker count").
pub struct JobQueueReceivers {
    pub db_sync_rx: tokio::sync::mpsc::Receiver<DatabaseSyncJob>,
    pub waitlist_process_rx: tokio::sync::mpsc::Receiver<Uuid>,
    pub waitlist_entry_rx: tokio::sync::mpsc::Receiver<WaitlistEntryJob>,
}

impl JobQueue {
    pub fn new(buffer_size: usize) -> (Self, JobQueueReceivers) {
        let (db_sync_tx, db_sync_rx) = tokio::sync::mpsc::channel(buffer_size);
        let (waitlist_process_tx, waitlist_process_rx) = tokio::sync::mpsc::channel(buffer_size);
        let (waitlist_entry_tx, waitlist_entry_rx) = tokio::sync::mpsc::channel(buffer_size);

        (
            Self {
                db_sync_tx,
                waitlist_process_tx,
                waitlist_entry_tx,
            },
            JobQueueReceivers {
                db_sync_rx,
                waitlist_process_rx,
                waitlist_entry_rx,
            },
        )
    }

    pub fn enqueue_db_sync(&self, job: DatabaseSyncJob) -> Result<(), QueueFull> {
        self.db_sync_tx.try_send(job).map_err(|_| QueueFull)
    }

    pub fn enqueue_waitlist_process(&self, section_id: Uuid) -> Result<(), QueueFull> {
        self.waitlist_process_tx
            .try_send(section_id)
            .map_err(|_| QueueFull)
    }

    pub fn enqueue_waitlist_entry(&self, job: WaitlistEntryJob) -> Result<(), QueueFull> {
        self.waitlist_entry_tx.try_send(job).map_err(|_| QueueFull)
    }
}
