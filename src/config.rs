//! Configuration surface, enumerated in spec §6.
//!
//! Loaded from environment variables (optionally via a `.env` file, as the
//! teacher's `bin/agentic_server.rs` does with `DATABASE_URL`). Every knob
//! has a documented default so the service runs out of the box against a
//! local Postgres instance.

use std::time::Duration;

/// Selects the job queue implementation. Only `InMemory` is implemented;
/// `Persistent` is reserved for a durable-broker-backed queue (see
/// DESIGN.md for the open-question resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    InMemory,
    Persistent,
}

/// Selects the waitlist backend. Only `Durable` (a relational table) is
/// implemented; `CounterStore` is the sorted-score alternative named in
/// spec §4.4/§9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitlistBackend {
    Durable,
    CounterStore,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_port: u16,
    pub database_url: String,
    pub counter_store_endpoint: Option<String>,
    pub queue_backend: QueueBackend,
    pub queue_buffer_size: usize,
    pub workers_per_topic: usize,
    pub waitlist_backend: WaitlistBackend,
    pub idempotency_ttl: Duration,
    pub shutdown_timeout: Duration,
}

impl Settings {
    /// Read settings from the environment, falling back to development
    /// defaults for anything not set. Mirrors the teacher's pattern of a
    /// bare `std::env::var(...).unwrap_or_else(...)` per field rather than
    /// a declarative parser, since the surface here is small and flat.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            server_port: env_parsed("SERVER_PORT", 3000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/registrar".to_string()),
            counter_store_endpoint: std::env::var("COUNTER_STORE_ENDPOINT").ok(),
            queue_backend: match std::env::var("QUEUE_BACKEND").as_deref() {
                Ok("persistent") => QueueBackend::Persistent,
                _ => QueueBackend::InMemory,
            },
            queue_buffer_size: env_parsed("QUEUE_BUFFER_SIZE", 1024),
            workers_per_topic: env_parsed("WORKERS_PER_TOPIC", 4),
            waitlist_backend: match std::env::var("WAITLIST_BACKEND").as_deref() {
                Ok("counter_store") => WaitlistBackend::CounterStore,
                _ => WaitlistBackend::Durable,
            },
            idempotency_ttl: Duration::from_secs(env_parsed("IDEMPOTENCY_TTL_SECS", 86_400)),
            shutdown_timeout: Duration::from_secs(env_parsed("SHUTDOWN_TIMEOUT_SECS", 30)),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
