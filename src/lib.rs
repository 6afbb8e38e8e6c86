//! Registration core: seat-reservation protocol, enrollment state machine,
//! waitlist, job queue/worker pool, and idempotency gate.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod db;
pub mod error;
pub mod idempotency;
pub mod jobs;
pub mod models;
pub mod telemetry;
pub mod waitlist;
