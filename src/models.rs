//! Core entities, per spec §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    pub student_number: String,
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
}

/// One offering of a course in a semester. `available_seats` is the
/// durable-store's view — reconciled asynchronously from the seat
/// counter, never read on the hot path (spec §4.3, §9).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Section {
    pub id: Uuid,
    pub course_id: Uuid,
    pub semester_id: Uuid,
    pub section_number: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Enrolled,
    Waitlisted,
    Dropped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub student_id: Uuid,
    pub section_id: Uuid,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub section_id: Uuid,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of a single-section registration attempt (spec §6 status
/// vocabulary). Carried in the HTTP response and cached verbatim by the
/// idempotency gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatusResult {
    Enrolled,
    Waitlisted,
    AlreadyRegistered,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub section_id: Uuid,
    pub status: RegistrationStatusResult,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<i64>,
}

/// Durable-sync job variants (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseSyncJobType {
    CreateRegistration,
    UpdateSeats,
    DropRegistration,
}

#[derive(Debug, Clone)]
pub struct DatabaseSyncJob {
    pub job_type: DatabaseSyncJobType,
    pub student_id: Uuid,
    pub section_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WaitlistEntryJob {
    pub student_id: Uuid,
    pub section_id: Uuid,
    pub position: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyKeyRecord {
    pub key: String,
    pub student_id: Uuid,
    pub request_hash: String,
    pub response_body: serde_json::Value,
    pub status_code: u16,
    pub processed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
