//! Section repository. Owns the optimistic-locked `available_seats` write
//! path (spec §4.3): the worker pool is the only writer, so contention is
//! low and an optimistic check is cheaper than a pessimistic row lock.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Section;

#[derive(Debug, thiserror::Error)]
pub enum SectionUpdateError {
    #[error("optimistic lock conflict on section")]
    OptimisticConflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn find_by_id(pool: &PgPool, section_id: Uuid) -> Result<Option<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(
        r#"SELECT id, course_id, semester_id, section_number, total_seats,
                  available_seats, active, version, created_at, updated_at
           FROM sections WHERE id = $1"#,
    )
    .bind(section_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_available(
    pool: &PgPool,
    semester_id: Uuid,
    course_id: Option<Uuid>,
) -> Result<Vec<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(
        r#"SELECT id, course_id, semester_id, section_number, total_seats,
                  available_seats, active, version, created_at, updated_at
           FROM sections
           WHERE semester_id = $1
             AND active = true
             AND ($2::uuid IS NULL OR course_id = $2)
           ORDER BY section_number"#,
    )
    .bind(semester_id)
    .bind(course_id)
    .fetch_all(pool)
    .await
}

/// Updates `available_seats` and bumps `version`, but only when the stored
/// `version` equals `section.version - 1`. Zero rows affected means another
/// writer raced us — surfaced as `OptimisticConflict`, retryable by the
/// caller (spec §4.3, §7).
pub async fn update_with_optimistic_lock(
    pool: &PgPool,
    section: &Section,
) -> Result<(), SectionUpdateError> {
    let result = sqlx::query(
        r#"UPDATE sections
           SET available_seats = $1, version = version + 1, updated_at = now()
           WHERE id = $2 AND version = $3"#,
    )
    .bind(section.available_seats)
    .bind(section.id)
    .bind(section.version - 1)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(SectionUpdateError::OptimisticConflict);
    }
    Ok(())
}

/// Returns `current_size + 1` for the section's waitlist under a
/// consistent read — the durable-store-backed option from spec §4.3/§9.
pub async fn next_waitlist_position(pool: &PgPool, section_id: Uuid) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as(r#"SELECT count(*) FROM waitlist_entries WHERE section_id = $1"#)
            .bind(section_id)
            .fetch_one(pool)
            .await?;
    Ok(count + 1)
}
