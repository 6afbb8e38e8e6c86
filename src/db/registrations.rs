//! Registration repository (spec §3, §4.5).
//!
//! Registrations are created by the worker pool after a successful seat
//! reservation, never directly by the coordinator (spec §2). `create` is a
//! no-op on replay (spec §4.5, §8's idempotence law), enforced by the
//! `UNIQUE(student_id, section_id)` constraint plus an `ON CONFLICT DO
//! NOTHING`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Registration;

pub async fn find_by_student_and_section(
    pool: &PgPool,
    student_id: Uuid,
    section_id: Uuid,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(
        r#"SELECT id, student_id, section_id, status, registered_at, version
           FROM registrations WHERE student_id = $1 AND section_id = $2"#,
    )
    .bind(student_id)
    .bind(section_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(
        r#"SELECT id, student_id, section_id, status, registered_at, version
           FROM registrations WHERE student_id = $1 ORDER BY registered_at"#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Inserts an `enrolled` registration row with version 1. A pre-existing
/// row for the same (student, section) is left untouched — this is what
/// makes replaying the job safe (spec §4.5, §8).
pub async fn create_enrolled(
    pool: &PgPool,
    student_id: Uuid,
    section_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO registrations (id, student_id, section_id, status, registered_at, version)
           VALUES ($1, $2, $3, 'enrolled', now(), 1)
           ON CONFLICT (student_id, section_id) DO NOTHING"#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(section_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn mark_dropped(
    pool: &PgPool,
    student_id: Uuid,
    section_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE registrations
           SET status = 'dropped', version = version + 1
           WHERE student_id = $1 AND section_id = $2 AND status = 'enrolled'"#,
    )
    .bind(student_id)
    .bind(section_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
