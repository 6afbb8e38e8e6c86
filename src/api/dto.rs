//! Request/response DTOs for the HTTP surface. Field names and response
//! envelopes match the wire shapes the load-test client and integration
//! suite depend on, so these are kept separate from the internal entity
//! types in `models` even where the fields line up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Registration, RegistrationStatus, Section, WaitlistEntry};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub student_id: Uuid,
    pub section_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DropRequest {
    pub student_id: Uuid,
    pub section_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct RegistrationDto {
    pub id: Uuid,
    pub student_id: Uuid,
    pub section_id: Uuid,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationDto {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            section_id: r.section_id,
            status: r.status,
            registered_at: r.registered_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationsResponse {
    pub registrations: Vec<RegistrationDto>,
}

#[derive(Debug, Serialize)]
pub struct WaitlistEntryDto {
    pub section_id: Uuid,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl From<WaitlistEntry> for WaitlistEntryDto {
    fn from(e: WaitlistEntry) -> Self {
        Self {
            section_id: e.section_id,
            position: e.position,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub waitlist_entries: Vec<WaitlistEntryDto>,
}

#[derive(Debug, Serialize)]
pub struct SectionDto {
    pub id: Uuid,
    pub course_id: Uuid,
    pub semester_id: Uuid,
    pub section_number: String,
    pub total_seats: i32,
    pub available_seats: i32,
}

impl From<Section> for SectionDto {
    fn from(s: Section) -> Self {
        Self {
            id: s.id,
            course_id: s.course_id,
            semester_id: s.semester_id,
            section_number: s.section_number,
            total_seats: s.total_seats,
            available_seats: s.available_seats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SectionsResponse {
    pub sections: Vec<SectionDto>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSectionsQuery {
    pub semester_id: Uuid,
    pub course_id: Option<Uuid>,
}
