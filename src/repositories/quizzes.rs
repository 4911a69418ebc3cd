use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{Quiz, QuizResult};

const QUIZ_COLUMNS: &str = "id, question, options, answer";
const RESULT_COLUMNS: &str = "id, student_id, score, total, taken_at";

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes").fetch_one(pool).await
}

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) question: &'a str,
    pub(crate) options: Vec<String>,
    pub(crate) answer: &'a str,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (id, question, options, answer)
         VALUES ($1,$2,$3,$4)
         RETURNING {QUIZ_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.question)
    .bind(Json(params.options))
    .bind(params.answer)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateQuizResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) score: i32,
    pub(crate) total: i32,
    pub(crate) taken_at: time::PrimitiveDateTime,
}

pub(crate) async fn insert_result(
    pool: &PgPool,
    params: CreateQuizResult<'_>,
) -> Result<QuizResult, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "INSERT INTO quiz_results (id, student_id, score, total, taken_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {RESULT_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.score)
    .bind(params.total)
    .bind(params.taken_at)
    .fetch_one(pool)
    .await
}
