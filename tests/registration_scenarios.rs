//! End-to-end registration scenarios, grounded on the concrete cases in
//! spec §8.
//!
//! All tests require a running PostgreSQL instance at `DATABASE_URL` with
//! migrations applied. Run with:
//! ```bash
//! DATABASE_URL=postgres://localhost/registrar_test \
//!   cargo test --test registration_scenarios -- --ignored --nocapture
//! ```

use std::sync::Arc;

use registrar::config::Settings;
use registrar::coordinator::RegistrationCoordinator;
use registrar::counter::{CounterStore, InMemorySeatCounterStore};
use registrar::idempotency::IdempotencyGate;
use registrar::jobs::JobQueue;
use registrar::models::{RegistrationStatusResult, StudentStatus};
use registrar::waitlist::WaitlistManager;
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let settings = Settings::from_env();
    sqlx::PgPool::connect(&settings.database_url)
        .await
        .expect("failed to connect to PostgreSQL — set DATABASE_URL")
}

async fn seed_student(pool: &PgPool, status: StudentStatus) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO students (id, student_number, status) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("S-{id}"))
        .bind(match status {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        })
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed_section(pool: &PgPool, total_seats: i32) -> Uuid {
    let course_id = Uuid::new_v4();
    let semester_id = Uuid::new_v4();
    let section_id = Uuid::new_v4();
    sqlx::query("INSERT INTO courses (id, code, title) VALUES ($1, 'CS-101', 'Intro')")
        .bind(course_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        r#"INSERT INTO sections
               (id, course_id, semester_id, section_number, total_seats, available_seats, active, version)
           VALUES ($1, $2, $3, '001', $4, $4, true, 1)"#,
    )
    .bind(section_id)
    .bind(course_id)
    .bind(semester_id)
    .bind(total_seats)
    .execute(pool)
    .await
    .unwrap();
    section_id
}

async fn build_coordinator(
    pool: PgPool,
    total_seats_by_section: &[(Uuid, i64)],
) -> RegistrationCoordinator {
    let counter: Arc<dyn CounterStore> = Arc::new(InMemorySeatCounterStore::new());
    for (section_id, seats) in total_seats_by_section {
        counter.set(*section_id, *seats).await;
    }
    let waitlist = Arc::new(WaitlistManager::new(pool.clone()));
    let (queue, _receivers) = JobQueue::new(1024);
    let idempotency = IdempotencyGate::new(pool.clone(), std::time::Duration::from_secs(86_400));
    RegistrationCoordinator::new(pool, counter, waitlist, queue, idempotency)
}

#[tokio::test]
#[ignore]
async fn single_seat_concurrent_registration_has_one_enrolled_one_waitlisted() {
    let pool = test_pool().await;
    let section = seed_section(&pool, 1).await;
    let a = seed_student(&pool, StudentStatus::Active).await;
    let b = seed_student(&pool, StudentStatus::Active).await;

    let coordinator = Arc::new(build_coordinator(pool.clone(), &[(section, 1)]).await);

    let (ra, rb) = tokio::join!(
        coordinator.register(a, &[section], None),
        coordinator.register(b, &[section], None),
    );

    let statuses: Vec<_> = [ra.unwrap().results, rb.unwrap().results]
        .concat()
        .into_iter()
        .map(|r| r.status)
        .collect();

    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == RegistrationStatusResult::Enrolled)
            .count(),
        1
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == RegistrationStatusResult::Waitlisted)
            .count(),
        1
    );
}

#[tokio::test]
#[ignore]
async fn inactive_student_is_rejected_before_any_counter_mutation() {
    let pool = test_pool().await;
    let section = seed_section(&pool, 5).await;
    let student = seed_student(&pool, StudentStatus::Inactive).await;

    let coordinator = build_coordinator(pool.clone(), &[(section, 5)]).await;
    let result = coordinator.register(student, &[section], None).await;

    assert!(result.is_err());
}

#[tokio::test]
#[ignore]
async fn missing_counter_key_fails_that_section_only() {
    let pool = test_pool().await;
    let student = seed_student(&pool, StudentStatus::Active).await;
    let s1 = seed_section(&pool, 5).await;
    let s2 = seed_section(&pool, 5).await; // deliberately not seeded into the counter
    let s3 = seed_section(&pool, 5).await;

    let coordinator = build_coordinator(pool.clone(), &[(s1, 5), (s3, 5)]).await;
    let response = coordinator
        .register(student, &[s1, s2, s3], None)
        .await
        .unwrap();

    let statuses: Vec<_> = response.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RegistrationStatusResult::Enrolled,
            RegistrationStatusResult::Failed,
            RegistrationStatusResult::Enrolled,
        ]
    );
}

#[tokio::test]
#[ignore]
async fn idempotency_key_replay_returns_identical_body_without_a_second_counter_mutation() {
    let pool = test_pool().await;
    let section = seed_section(&pool, 5).await;
    let student = seed_student(&pool, StudentStatus::Active).await;

    let coordinator = build_coordinator(pool.clone(), &[(section, 5)]).await;
    let key = "replay-test-key";

    let first = coordinator
        .register(student, &[section], Some(key))
        .await
        .unwrap();
    let second = coordinator
        .register(student, &[section], Some(key))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}
