//! Structured logging init, grounded on the teacher's
//! `tracing_subscriber::fmt::init()` call in `bin/agentic_server.rs`,
//! extended with an `EnvFilter` so log verbosity is configurable via
//! `RUST_LOG` without a recompile.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
