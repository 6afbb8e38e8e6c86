//! Course repository — supplemented per SPEC_FULL §3: `Section` names an
//! "owning course", and the available-sections query needs something to
//! join against. No eligibility/prerequisite logic lives here (non-goal).

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Course;

pub async fn find_by_id(pool: &PgPool, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(r#"SELECT id, code, title FROM courses WHERE id = $1"#)
        .bind(course_id)
        .fetch_optional(pool)
        .await
}
