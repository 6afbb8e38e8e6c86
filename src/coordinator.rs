//! Registration Coordinator (spec §4.1). Holds no persistent state of its
//! own — every call is a short sequence of round-trips to the counter, the
//! durable store, the waitlist manager, and the job queue, with no lock held
//! across any of them (spec §5).

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::counter::{CounterError, CounterStore};
use crate::db;
use crate::error::{CoreError, CoreResult};
use crate::idempotency::{Admission, IdempotencyGate};
use crate::jobs::JobQueue;
use crate::models::{
    DatabaseSyncJob, DatabaseSyncJobType, Registration, RegistrationStatus,
    RegistrationStatusResult, Section, SectionResult, WaitlistEntry,
};
use crate::waitlist::WaitlistManager;

pub struct RegistrationCoordinator {
    pool: PgPool,
    counter: Arc<dyn CounterStore>,
    waitlist: Arc<WaitlistManager>,
    queue: JobQueue,
    idempotency: IdempotencyGate,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RegisterResponse {
    pub results: Vec<SectionResult>,
}

impl RegistrationCoordinator {
    pub fn new(
        pool: PgPool,
        counter: Arc<dyn CounterStore>,
        waitlist: Arc<WaitlistManager>,
        queue: JobQueue,
        idempotency: IdempotencyGate,
    ) -> Self {
        Self {
            pool,
            counter,
            waitlist,
            queue,
            idempotency,
        }
    }

    /// `register` (spec §4.1 steps 1-4).
    pub async fn register(
        &self,
        student_id: Uuid,
        section_ids: &[Uuid],
        idempotency_key: Option<&str>,
    ) -> CoreResult<RegisterResponse> {
        if section_ids.is_empty() {
            return Err(CoreError::InvalidRequest(
                "section_ids must be non-empty".into(),
            ));
        }

        let request_body = serde_json::json!({ "section_ids": section_ids });
        let request_hash = IdempotencyGate::hash_request(student_id, &request_body);

        if let Some(key) = idempotency_key {
            match self.idempotency.admit(key, student_id, &request_hash).await? {
                Admission::Replay { body, .. } => {
                    let response: RegisterResponse = serde_json::from_value(body)
                        .map_err(|e| CoreError::Internal(e.to_string()))?;
                    return Ok(response);
                }
                Admission::Proceed => {}
            }
        }

        let student = db::students::find_by_id(&self.pool, student_id)
            .await?
            .ok_or(CoreError::StudentNotFound)?;
        if !student.is_active() {
            return Err(CoreError::StudentInactive);
        }

        let mut results = Vec::with_capacity(section_ids.len());
        for &section_id in section_ids {
            results.push(self.attempt_section(student_id, section_id).await);
        }

        let response = RegisterResponse { results };

        if let Some(key) = idempotency_key {
            let body = serde_json::to_value(&response)
                .map_err(|e| CoreError::Internal(e.to_string()))?;
            self.idempotency
                .commit(key, student_id, &request_hash, 200, &body)
                .await?;
        }

        Ok(response)
    }

    /// One section's worth of spec §4.1 step 3. Never returns `Err` — every
    /// failure mode for a single section is expressed as a `failed`
    /// `SectionResult` so the rest of the batch proceeds.
    async fn attempt_section(&self, student_id: Uuid, section_id: Uuid) -> SectionResult {
        match db::registrations::find_by_student_and_section(&self.pool, student_id, section_id)
            .await
        {
            Ok(Some(existing)) => {
                return SectionResult {
                    section_id,
                    status: RegistrationStatusResult::AlreadyRegistered,
                    message: format!("already {:?}", existing.status).to_lowercase(),
                    waitlist_position: None,
                };
            }
            Ok(None) => {}
            Err(e) => {
                return SectionResult {
                    section_id,
                    status: RegistrationStatusResult::Failed,
                    message: format!("lookup failed: {e}"),
                    waitlist_position: None,
                };
            }
        }

        match self.counter.decrement_and_get(section_id).await {
            Ok(_) => self.reserve_seat(student_id, section_id).await,
            Err(CounterError::Exhausted) => self.enqueue_waitlist(student_id, section_id).await,
            Err(CounterError::Missing) => match self.counter.get(section_id).await {
                Some(0) => self.enqueue_waitlist(student_id, section_id).await,
                _ => SectionResult {
                    section_id,
                    status: RegistrationStatusResult::Failed,
                    message: "seat counter unreachable".into(),
                    waitlist_position: None,
                },
            },
        }
    }

    async fn reserve_seat(&self, student_id: Uuid, section_id: Uuid) -> SectionResult {
        let job = DatabaseSyncJob {
            job_type: DatabaseSyncJobType::CreateRegistration,
            student_id,
            section_id,
            timestamp: Utc::now(),
        };
        match self.queue.enqueue_db_sync(job) {
            Ok(()) => SectionResult {
                section_id,
                status: RegistrationStatusResult::Enrolled,
                message: "enrolled".into(),
                waitlist_position: None,
            },
            Err(_) => {
                let _ = self.counter.increment(section_id).await;
                SectionResult {
                    section_id,
                    status: RegistrationStatusResult::Failed,
                    message: "registration queue is full".into(),
                    waitlist_position: None,
                }
            }
        }
    }

    async fn enqueue_waitlist(&self, student_id: Uuid, section_id: Uuid) -> SectionResult {
        let position = match self.waitlist.append(student_id, section_id).await {
            Ok(p) => p,
            Err(e) => {
                return SectionResult {
                    section_id,
                    status: RegistrationStatusResult::Failed,
                    message: format!("waitlist append failed: {e}"),
                    waitlist_position: None,
                };
            }
        };

        let job = crate::models::WaitlistEntryJob {
            student_id,
            section_id,
            position,
            timestamp: Utc::now(),
        };
        if self.queue.enqueue_waitlist_entry(job).is_err() {
            tracing::warn!(
                %student_id,
                %section_id,
                position,
                "waitlist_entry queue full, in-memory position assigned without a durable mirror yet"
            );
        }

        SectionResult {
            section_id,
            status: RegistrationStatusResult::Waitlisted,
            message: "waitlisted".into(),
            waitlist_position: Some(position),
        }
    }

    /// `drop` (spec §4.1 steps 1-5).
    pub async fn drop(&self, student_id: Uuid, section_id: Uuid) -> CoreResult<()> {
        let registration =
            db::registrations::find_by_student_and_section(&self.pool, student_id, section_id)
                .await?
                .filter(|r| r.status == RegistrationStatus::Enrolled)
                .ok_or(CoreError::NotEnrolled)?;
        let _ = registration;

        self.counter
            .increment(section_id)
            .await
            .map_err(|e| CoreError::Counter(e.to_string()))?;

        match db::registrations::mark_dropped(&self.pool, student_id, section_id).await {
            Ok(true) => {}
            Ok(false) => {
                let _ = self.counter.decrement(section_id).await;
                return Err(CoreError::NotEnrolled);
            }
            Err(e) => {
                let _ = self.counter.decrement(section_id).await;
                return Err(e.into());
            }
        }

        let job = DatabaseSyncJob {
            job_type: DatabaseSyncJobType::UpdateSeats,
            student_id,
            section_id,
            timestamp: Utc::now(),
        };
        if self.queue.enqueue_db_sync(job).is_err() {
            tracing::error!(%student_id, %section_id, "update_seats enqueue failed after drop");
        }

        if self.queue.enqueue_waitlist_process(section_id).is_err() {
            tracing::error!(%section_id, "waitlist_process enqueue failed after drop");
        }

        Ok(())
    }

    pub async fn get_registrations(&self, student_id: Uuid) -> CoreResult<Vec<Registration>> {
        Ok(db::registrations::list_for_student(&self.pool, student_id).await?)
    }

    pub async fn get_waitlist(&self, student_id: Uuid) -> CoreResult<Vec<WaitlistEntry>> {
        Ok(self.waitlist.by_student(student_id).await?)
    }

    pub async fn get_available_sections(
        &self,
        semester_id: Uuid,
        course_id: Option<Uuid>,
    ) -> CoreResult<Vec<Section>> {
        Ok(db::sections::list_available(&self.pool, semester_id, course_id).await?)
    }
}
