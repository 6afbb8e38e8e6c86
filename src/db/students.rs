//! Student repository. Students are provisioned by administrative
//! collaborators outside this core (spec §3) — only reads are exposed here.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Student;

pub async fn find_by_id(pool: &PgPool, student_id: Uuid) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        r#"SELECT id, student_number, status FROM students WHERE id = $1"#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
