//! Job Queue & Worker Pool (spec §4.5), grounded on the teacher's
//! `bpmn_integration::pending_dispatch_worker` module.

pub mod handlers;
pub mod queue;
pub mod worker;

pub use handlers::JobContext;
pub use queue::{JobQueue, JobQueueReceivers, QueueFull};
