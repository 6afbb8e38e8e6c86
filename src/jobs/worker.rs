//! Worker pool (spec §4.5). A fixed number of workers per topic drain their
//! channel with a bounded poll so each worker periodically checks the
//! shutdown signal even while idle — the same `tokio::select!` against a
//! `watch::Receiver<bool>` the teacher uses in `PendingDispatchWorker::run`.
//! Each job handler runs under a fixed timeout; a handler that hangs is
//! logged and abandoned rather than allowed to wedge the worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::models::{DatabaseSyncJob, DatabaseSyncJobType, WaitlistEntryJob};

use super::handlers::{self, JobContext};
use super::queue::JobQueueReceivers;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// `waitlist_process` is specified as self-retrying on transient failure
/// (spec §4.5), unlike `database_sync`/`waitlist_entry`. A dropped seat
/// with no pending promotion would otherwise sit unpromoted until the next
/// unrelated drop on the same section.
fn requeue_waitlist_process(ctx: &JobContext, section_id: Uuid) {
    if ctx.queue.enqueue_waitlist_process(section_id).is_err() {
        tracing::error!(
            section_id = %section_id,
            "waitlist_process retry enqueue failed, queue full"
        );
    }
}

/// Spawns `workers_per_topic` workers for each of the three job topics and
/// returns immediately; the returned `JoinHandle`s resolve once every worker
/// observes the shutdown signal and drains its in-flight handler.
pub fn spawn(
    ctx: Arc<JobContext>,
    receivers: JobQueueReceivers,
    workers_per_topic: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::with_capacity(workers_per_topic * 3);

    let db_sync_rx = Arc::new(Mutex::new(receivers.db_sync_rx));
    let waitlist_process_rx = Arc::new(Mutex::new(receivers.waitlist_process_rx));
    let waitlist_entry_rx = Arc::new(Mutex::new(receivers.waitlist_entry_rx));

    for worker_id in 0..workers_per_topic {
        handles.push(tokio::spawn(run_db_sync_worker(
            worker_id,
            ctx.clone(),
            db_sync_rx.clone(),
            shutdown_rx.clone(),
        )));
        handles.push(tokio::spawn(run_waitlist_process_worker(
            worker_id,
            ctx.clone(),
            waitlist_process_rx.clone(),
            shutdown_rx.clone(),
        )));
        handles.push(tokio::spawn(run_waitlist_entry_worker(
            worker_id,
            ctx.clone(),
            waitlist_entry_rx.clone(),
            shutdown_rx.clone(),
        )));
    }

    handles
}

async fn run_db_sync_worker(
    worker_id: usize,
    ctx: Arc<JobContext>,
    rx: Arc<Mutex<tokio::sync::mpsc::Receiver<DatabaseSyncJob>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::info!(worker_id, topic = "db_sync", "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let job = {
            let mut guard = rx.lock().await;
            tokio::select! {
                job = tokio::time::timeout(POLL_INTERVAL, guard.recv()) => job.ok().flatten(),
                _ = shutdown_rx.changed() => None,
            }
        };

        let Some(job) = job else {
            if *shutdown_rx.borrow() {
                break;
            }
            continue;
        };

        let result = tokio::time::timeout(JOB_TIMEOUT, async {
            match job.job_type {
                DatabaseSyncJobType::CreateRegistration => {
                    handlers::create_registration(&ctx, &job).await
                }
                DatabaseSyncJobType::DropRegistration => {
                    handlers::drop_registration(&ctx, &job).await
                }
                DatabaseSyncJobType::UpdateSeats => handlers::update_seats(&ctx, &job).await,
            }
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                worker_id,
                topic = "db_sync",
                job_type = ?job.job_type,
                section_id = %job.section_id,
                error = %e,
                "job handler failed"
            ),
            Err(_) => tracing::error!(
                worker_id,
                topic = "db_sync",
                job_type = ?job.job_type,
                section_id = %job.section_id,
                "job handler timed out"
            ),
        }
    }
    tracing::info!(worker_id, topic = "db_sync", "worker stopped");
}

async fn run_waitlist_process_worker(
    worker_id: usize,
    ctx: Arc<JobContext>,
    rx: Arc<Mutex<tokio::sync::mpsc::Receiver<Uuid>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::info!(worker_id, topic = "waitlist_process", "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let section_id = {
            let mut guard = rx.lock().await;
            tokio::select! {
                job = tokio::time::timeout(POLL_INTERVAL, guard.recv()) => job.ok().flatten(),
                _ = shutdown_rx.changed() => None,
            }
        };

        let Some(section_id) = section_id else {
            if *shutdown_rx.borrow() {
                break;
            }
            continue;
        };

        match tokio::time::timeout(JOB_TIMEOUT, handlers::waitlist_process(&ctx, section_id)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    worker_id,
                    topic = "waitlist_process",
                    section_id = %section_id,
                    error = %e,
                    "job handler failed, re-enqueuing for retry"
                );
                requeue_waitlist_process(&ctx, section_id);
            }
            Err(_) => {
                tracing::error!(
                    worker_id,
                    topic = "waitlist_process",
                    section_id = %section_id,
                    "job handler timed out, re-enqueuing for retry"
                );
                requeue_waitlist_process(&ctx, section_id);
            }
        }
    }
    tracing::info!(worker_id, topic = "waitlist_process", "worker stopped");
}

async fn run_waitlist_entry_worker(
    worker_id: usize,
    ctx: Arc<JobContext>,
    rx: Arc<Mutex<tokio::sync::mpsc::Receiver<WaitlistEntryJob>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::info!(worker_id, topic = "waitlist_entry", "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let job = {
            let mut guard = rx.lock().await;
            tokio::select! {
                job = tokio::time::timeout(POLL_INTERVAL, guard.recv()) => job.ok().flatten(),
                _ = shutdown_rx.changed() => None,
            }
        };

        let Some(job) = job else {
            if *shutdown_rx.borrow() {
                break;
            }
            continue;
        };

        match tokio::time::timeout(JOB_TIMEOUT, handlers::waitlist_entry(&ctx, &job)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                worker_id,
                topic = "waitlist_entry",
                section_id = %job.section_id,
                error = %e,
                "job handler failed"
            ),
            Err(_) => tracing::error!(
                worker_id,
                topic = "waitlist_entry",
                section_id = %job.section_id,
                "job handler timed out"
            ),
        }
    }
    tracing::info!(worker_id, topic = "waitlist_entry", "worker stopped");
}
