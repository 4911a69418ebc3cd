use sqlx::PgPool;

use crate::db::models::Assignment;

const COLUMNS: &str = "id, student_id, course_id, filename, original_filename, submitted_at";

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) filename: &'a str,
    pub(crate) original_filename: &'a str,
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, student_id, course_id, filename, original_filename, submitted_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.course_id)
    .bind(params.filename)
    .bind(params.original_filename)
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments WHERE student_id = $1 ORDER BY submitted_at",
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}
