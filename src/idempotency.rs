//! Idempotency Gate (spec §4.6), grounded on `rust-dd-tako`'s
//! Idempotency-Key plugin for the key/scope/TTL/conflict shape, persisted
//! through `db::idempotency` in the style of `leynos-wildside`'s
//! `diesel_idempotency_repository`.
//!
//! A key scopes to a single student (spec §4.6): the cache key is
//! `(student_id, key)`, and the payload signature is a SHA-256 hash of the
//! canonical request body, matching the teacher's use of `sha2` in
//! `database/session_repository.rs`.

use chrono::{Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{CoreError, CoreResult};
use crate::models::IdempotencyKeyRecord;

pub struct IdempotencyGate {
    pool: PgPool,
    ttl: ChronoDuration,
}

/// What the caller should do before processing a request under a given key.
pub enum Admission {
    /// No prior record, or the prior record expired: proceed, then call
    /// `commit` with the result.
    Proceed,
    /// A live, matching record exists: return this cached response verbatim
    /// without re-running the request.
    Replay {
        status_code: u16,
        body: serde_json::Value,
    },
}

impl IdempotencyGate {
    pub fn new(pool: PgPool, ttl: std::time::Duration) -> Self {
        Self {
            pool,
            ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::days(1)),
        }
    }

    pub fn hash_request(student_id: Uuid, body: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(student_id.as_bytes());
        hasher.update(body.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Checks whether `key` has already been seen for `student_id`. Expired
    /// records are deleted on read rather than left for a separate sweep,
    /// since a read is the only time staleness matters (spec §4.6).
    ///
    /// A brand-new key is claimed with an atomic `INSERT ... ON CONFLICT DO
    /// NOTHING` rather than a plain "not found -> proceed" check, so two
    /// concurrent requests racing on the same never-before-seen key can't
    /// both win `Proceed` and both mutate the seat counter. The loser sees
    /// its claim fail, re-reads what the winner left behind, and either
    /// replays the winner's response or — if the winner hasn't committed
    /// yet (`status_code == 0`, the in-flight sentinel) — is told to treat
    /// it as a conflict rather than block or double-process.
    pub async fn admit(
        &self,
        key: &str,
        student_id: Uuid,
        request_hash: &str,
    ) -> CoreResult<Admission> {
        loop {
            let Some(existing) = db::idempotency::find(&self.pool, key, student_id).await? else {
                let now = Utc::now();
                let won = db::idempotency::claim(
                    &self.pool,
                    key,
                    student_id,
                    request_hash,
                    now,
                    now + self.ttl,
                )
                .await?;
                if won {
                    return Ok(Admission::Proceed);
                }
                continue; // lost the race; re-read what the winner claimed
            };

            if existing.expires_at <= Utc::now() {
                db::idempotency::delete(&self.pool, key, student_id).await?;
                continue;
            }

            if existing.status_code == 0 {
                // Another request has claimed this key and is still
                // processing; there is no response yet to replay.
                return Err(CoreError::IdempotencyConflict);
            }

            if existing.request_hash != request_hash {
                return Err(CoreError::IdempotencyConflict);
            }

            return Ok(Admission::Replay {
                status_code: existing.status_code,
                body: existing.response_body,
            });
        }
    }

    /// Persists the response under `key` so a replay within the TTL window
    /// can short-circuit future requests.
    pub async fn commit(
        &self,
        key: &str,
        student_id: Uuid,
        request_hash: &str,
        status_code: u16,
        body: &serde_json::Value,
    ) -> CoreResult<()> {
        let now = Utc::now();
        let record = IdempotencyKeyRecord {
            key: key.to_string(),
            student_id,
            request_hash: request_hash.to_string(),
            response_body: body.clone(),
            status_code,
            processed_at: now,
            expires_at: now + self.ttl,
        };
        db::idempotency::commit(&self.pool, &record).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_identical_inputs() {
        let student_id = Uuid::new_v4();
        let body = serde_json::json!({"section_ids": ["a", "b"]});
        let h1 = IdempotencyGate::hash_request(student_id, &body);
        let h2 = IdempotencyGate::hash_request(student_id, &body);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_differs_for_different_students_or_bodies() {
        let body = serde_json::json!({"section_ids": ["a"]});
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        assert_ne!(
            IdempotencyGate::hash_request(s1, &body),
            IdempotencyGate::hash_request(s2, &body)
        );

        let other_body = serde_json::json!({"section_ids": ["b"]});
        assert_ne!(
            IdempotencyGate::hash_request(s1, &body),
            IdempotencyGate::hash_request(s1, &other_body)
        );
    }
}
