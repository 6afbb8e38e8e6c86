//! Job handlers (spec §4.5). Each handler is given a bounded context of the
//! collaborators it needs; none of them hold a lock across an await, and
//! none retry indefinitely — bounded backoff only, matching the teacher's
//! `PendingDispatchWorker` (`MAX_ATTEMPTS`, linear backoff) idiom.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::counter::CounterStore;
use crate::db;
use crate::db::sections::SectionUpdateError;
use crate::models::{DatabaseSyncJob, DatabaseSyncJobType, WaitlistEntryJob};
use crate::waitlist::WaitlistManager;

use super::queue::JobQueue;

const OPTIMISTIC_LOCK_MAX_ATTEMPTS: u32 = 3;
const OPTIMISTIC_LOCK_BACKOFF: Duration = Duration::from_millis(100);

pub struct JobContext {
    pub pool: PgPool,
    pub counter: Arc<dyn CounterStore>,
    pub waitlist: Arc<WaitlistManager>,
    pub queue: JobQueue,
}

/// `create_registration`: no-op if the row already exists (safe replay).
/// Otherwise inserts `enrolled` / version 1.
pub async fn create_registration(ctx: &JobContext, job: &DatabaseSyncJob) -> anyhow::Result<()> {
    db::registrations::create_enrolled(&ctx.pool, job.student_id, job.section_id).await?;
    Ok(())
}

/// `drop_registration`: marks the registration dropped.
pub async fn drop_registration(ctx: &JobContext, job: &DatabaseSyncJob) -> anyhow::Result<()> {
    db::registrations::mark_dropped(&ctx.pool, job.student_id, job.section_id).await?;
    Ok(())
}

/// `update_seats`: reads the live counter value, loads the section, and
/// writes `available_seats` back under the optimistic lock. Retries up to
/// 3 times with `100ms * attempt` backoff on `optimistic_conflict` (spec
/// §4.5, §7).
pub async fn update_seats(ctx: &JobContext, job: &DatabaseSyncJob) -> anyhow::Result<()> {
    let current = ctx
        .counter
        .get(job.section_id)
        .await
        .ok_or_else(|| anyhow::anyhow!("counter missing for section {}", job.section_id))?;

    for attempt in 1..=OPTIMISTIC_LOCK_MAX_ATTEMPTS {
        let mut section = db::sections::find_by_id(&ctx.pool, job.section_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("section {} not found", job.section_id))?;
        section.available_seats = current as i32;
        section.version += 1;

        match db::sections::update_with_optimistic_lock(&ctx.pool, &section).await {
            Ok(()) => return Ok(()),
            Err(SectionUpdateError::OptimisticConflict) if attempt < OPTIMISTIC_LOCK_MAX_ATTEMPTS => {
                tokio::time::sleep(OPTIMISTIC_LOCK_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    anyhow::bail!(
        "update_seats: exhausted optimistic-lock retries for section {}",
        job.section_id
    )
}

/// `waitlist_process`: peeks the head of the section's waitlist. If seats
/// are exhausted, no-ops (the next drop will re-trigger promotion).
/// Otherwise reserves a seat and promotes the head entry, compensating with
/// an `increment` if the durable deletion fails.
pub async fn waitlist_process(ctx: &JobContext, section_id: Uuid) -> anyhow::Result<()> {
    let Some(head) = ctx.waitlist.peek_head(section_id).await? else {
        return Ok(());
    };

    match ctx.counter.decrement_and_get(section_id).await {
        Ok(_) => {}
        Err(_) => return Ok(()), // counter exhausted or missing: nothing to promote with yet
    }

    match ctx.waitlist.delete(head.id, section_id).await {
        Ok(true) => {
            let job = DatabaseSyncJob {
                job_type: DatabaseSyncJobType::CreateRegistration,
                student_id: head.student_id,
                section_id,
                timestamp: Utc::now(),
            };
            if ctx.queue.enqueue_db_sync(job).is_err() {
                tracing::error!(
                    section_id = %section_id,
                    student_id = %head.student_id,
                    "waitlist_process: db_sync queue full after promotion, seat reserved without a registration row"
                );
            }
        }
        Ok(false) => {
            // Already removed by a racing promotion; compensate the extra decrement.
            let _ = ctx.counter.increment(section_id).await;
        }
        Err(e) => {
            let _ = ctx.counter.increment(section_id).await;
            return Err(e.into());
        }
    }

    Ok(())
}

/// `waitlist_entry`: durably writes the waitlist row. The in-memory
/// position was already assigned synchronously by `WaitlistManager::append`
/// at enqueue time, so this is a best-effort durability pass, not the
/// source of truth for ordering.
pub async fn waitlist_entry(ctx: &JobContext, job: &WaitlistEntryJob) -> anyhow::Result<()> {
    db::waitlist::insert(
        &ctx.pool,
        Uuid::new_v4(),
        job.student_id,
        job.section_id,
        job.position,
        job.timestamp,
    )
    .await?;
    Ok(())
}
