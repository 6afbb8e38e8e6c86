//! Service entry point, grounded on the teacher's `bin/agentic_server.rs`
//! (pool setup, CORS/Trace layers, `axum::serve`).

use std::sync::Arc;

use registrar::config::Settings;
use registrar::coordinator::RegistrationCoordinator;
use registrar::counter::{CounterStore, InMemorySeatCounterStore};
use registrar::db;
use registrar::idempotency::IdempotencyGate;
use registrar::jobs::{worker, JobContext, JobQueue};
use registrar::waitlist::WaitlistManager;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    registrar::telemetry::init();

    let settings = Settings::from_env();

    let pool = db::pool::connect(&settings.database_url).await?;
    db::pool::run_migrations(&pool).await?;

    let counter: Arc<dyn CounterStore> = Arc::new(InMemorySeatCounterStore::new());
    warm_up_counter(&pool, &counter).await?;

    let waitlist = Arc::new(WaitlistManager::new(pool.clone()));
    let (queue, receivers) = JobQueue::new(settings.queue_buffer_size);
    let idempotency = IdempotencyGate::new(pool.clone(), settings.idempotency_ttl);

    let coordinator = Arc::new(RegistrationCoordinator::new(
        pool.clone(),
        counter.clone(),
        waitlist.clone(),
        queue.clone(),
        idempotency,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let job_ctx = Arc::new(JobContext {
        pool: pool.clone(),
        counter,
        waitlist,
        queue,
    });
    let worker_handles = worker::spawn(
        job_ctx,
        receivers,
        settings.workers_per_topic,
        shutdown_rx.clone(),
    );

    let app = registrar::api::router(coordinator)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.server_port));
    tracing::info!(%addr, "registrar-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("http server stopped, signalling workers to drain");
    let _ = shutdown_tx.send(true);

    let drain = async {
        for handle in worker_handles {
            let _ = handle.await;
        }
    };
    match tokio::time::timeout(settings.shutdown_timeout, drain).await {
        Ok(_) => tracing::info!("worker pool drained"),
        Err(_) => tracing::warn!("worker pool did not drain within the shutdown timeout"),
    }

    Ok(())
}

/// Sets every active section's counter to its durable `available_seats`
/// value (spec §4.2 `set` is "used only at warm-up and reconciliation").
async fn warm_up_counter(
    pool: &sqlx::PgPool,
    counter: &Arc<dyn CounterStore>,
) -> anyhow::Result<()> {
    let sections = sqlx::query_as::<_, registrar::models::Section>(
        r#"SELECT id, course_id, semester_id, section_number, total_seats,
                  available_seats, active, version, created_at, updated_at
           FROM sections WHERE active = true"#,
    )
    .fetch_all(pool)
    .await?;

    for section in sections {
        counter.set(section.id, section.available_seats as i64).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
