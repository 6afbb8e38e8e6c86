//! Durable idempotency-key table, grounded on `leynos-wildside`'s
//! `diesel_idempotency_repository.rs` (persisted response/hash/expiry row)
//! adapted from Diesel to `sqlx`, and the teacher's `sha2` dependency
//! already used in `database/session_repository.rs`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::IdempotencyKeyRecord;

pub async fn find(
    pool: &PgPool,
    key: &str,
    student_id: Uuid,
) -> Result<Option<IdempotencyKeyRecord>, sqlx::Error> {
    sqlx::query_as::<_, IdempotencyKeyRecordRow>(
        r#"SELECT key, student_id, request_hash, response_body, status_code,
                  processed_at, expires_at
           FROM idempotency_keys WHERE key = $1 AND student_id = $2"#,
    )
    .bind(key)
    .bind(student_id)
    .fetch_optional(pool)
    .await
    .map(|row| row.map(Into::into))
}

pub async fn delete(pool: &PgPool, key: &str, student_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM idempotency_keys WHERE key = $1 AND student_id = $2"#)
        .bind(key)
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Atomically claims `(key, student_id)` with a `status_code = 0` sentinel
/// row (0 is not a valid HTTP status) before the request is processed, so
/// two concurrent first-sights of the same key can't both observe "no row"
/// and both proceed. Returns `true` if this call won the claim.
pub async fn claim(
    pool: &PgPool,
    key: &str,
    student_id: Uuid,
    request_hash: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO idempotency_keys
               (key, student_id, request_hash, response_body, status_code, processed_at, expires_at)
           VALUES ($1, $2, $3, 'null'::jsonb, 0, $4, $5)
           ON CONFLICT (key, student_id) DO NOTHING"#,
    )
    .bind(key)
    .bind(student_id)
    .bind(request_hash)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn commit(
    pool: &PgPool,
    record: &IdempotencyKeyRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO idempotency_keys
               (key, student_id, request_hash, response_body, status_code, processed_at, expires_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (key, student_id) DO UPDATE SET
               request_hash = excluded.request_hash,
               response_body = excluded.response_body,
               status_code = excluded.status_code,
               processed_at = excluded.processed_at,
               expires_at = excluded.expires_at"#,
    )
    .bind(&record.key)
    .bind(record.student_id)
    .bind(&record.request_hash)
    .bind(&record.response_body)
    .bind(record.status_code as i32)
    .bind(record.processed_at)
    .bind(record.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct IdempotencyKeyRecordRow {
    key: String,
    student_id: Uuid,
    request_hash: String,
    response_body: serde_json::Value,
    status_code: i32,
    processed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<IdempotencyKeyRecordRow> for IdempotencyKeyRecord {
    fn from(row: IdempotencyKeyRecordRow) -> Self {
        Self {
            key: row.key,
            student_id: row.student_id,
            request_hash: row.request_hash,
            response_body: row.response_body,
            status_code: row.status_code as u16,
            processed_at: row.processed_at,
            expires_at: row.expires_at,
        }
    }
}
