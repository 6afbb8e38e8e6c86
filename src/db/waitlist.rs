//! Durable waitlist table — the relational-table option named in spec
//! §4.4/§9. `waitlist::WaitlistManager` layers an in-memory ordered index
//! on top of this for O(log n) `peek_head`/`position` under contention.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::WaitlistEntry;

pub async fn insert(
    pool: &PgPool,
    id: Uuid,
    student_id: Uuid,
    section_id: Uuid,
    position: i64,
    created_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO waitlist_entries (id, student_id, section_id, position, created_at)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (student_id, section_id) DO NOTHING"#,
    )
    .bind(id)
    .bind(student_id)
    .bind(section_id)
    .bind(position)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, entry_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM waitlist_entries WHERE id = $1"#)
        .bind(entry_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Smallest-position entry for the section. Gaps from prior deletions are
/// tolerated (spec §4.4) — this is a plain `ORDER BY position LIMIT 1`, not
/// a compacting scan.
pub async fn peek_head(
    pool: &PgPool,
    section_id: Uuid,
) -> Result<Option<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(
        r#"SELECT id, student_id, section_id, position, created_at, expires_at
           FROM waitlist_entries WHERE section_id = $1
           ORDER BY position ASC LIMIT 1"#,
    )
    .bind(section_id)
    .fetch_optional(pool)
    .await
}

pub async fn by_section(
    pool: &PgPool,
    section_id: Uuid,
) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(
        r#"SELECT id, student_id, section_id, position, created_at, expires_at
           FROM waitlist_entries WHERE section_id = $1 ORDER BY position ASC"#,
    )
    .bind(section_id)
    .fetch_all(pool)
    .await
}

pub async fn by_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(
        r#"SELECT id, student_id, section_id, position, created_at, expires_at
           FROM waitlist_entries WHERE student_id = $1 ORDER BY created_at ASC"#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub async fn size(pool: &PgPool, section_id: Uuid) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as(r#"SELECT count(*) FROM waitlist_entries WHERE section_id = $1"#)
            .bind(section_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn position(
    pool: &PgPool,
    student_id: Uuid,
    section_id: Uuid,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"SELECT position FROM waitlist_entries WHERE student_id = $1 AND section_id = $2"#,
    )
    .bind(student_id)
    .bind(section_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(p,)| p))
}
