//! Durable Store (spec §4.3) — per-entity repository modules over a
//! `sqlx::PgPool`, following the teacher's one-repository-per-entity
//! convention (`database/cbu_repository.rs`, `database/session_repository.rs`).

pub mod courses;
pub mod idempotency;
pub mod pool;
pub mod registrations;
pub mod sections;
pub mod students;
pub mod waitlist;

pub use sections::SectionUpdateError;
