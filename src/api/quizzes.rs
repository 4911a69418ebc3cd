use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Quiz;
use crate::repositories;
use crate::schemas::quiz::{QuizResponse, QuizScoreResponse, QuizSubmission};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_quizzes)).route("/submit", post(submit_answers))
}

async fn list_quizzes(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let quizzes = repositories::quizzes::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.into_iter().map(QuizResponse::from_db).collect()))
}

async fn submit_answers(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<QuizSubmission>,
) -> Result<Json<QuizScoreResponse>, ApiError> {
    if payload.answers.is_empty() {
        return Err(ApiError::BadRequest("No answers submitted".to_string()));
    }

    let quizzes = repositories::quizzes::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quizzes"))?;

    // Every referenced quiz must exist before any scoring happens, so a
    // bad submission leaves no result row behind.
    let by_id: HashMap<&str, &Quiz> =
        quizzes.iter().map(|quiz| (quiz.id.as_str(), quiz)).collect();

    for quiz_id in payload.answers.keys() {
        if !by_id.contains_key(quiz_id.as_str()) {
            return Err(ApiError::NotFound(format!("Quiz {quiz_id} not found")));
        }
    }

    let total = quizzes.len() as i32;
    let score = payload
        .answers
        .iter()
        .filter(|(quiz_id, answer)| {
            by_id
                .get(quiz_id.as_str())
                .is_some_and(|quiz| answers_match(answer, &quiz.answer))
        })
        .count() as i32;

    let result = repositories::quizzes::insert_result(
        state.db(),
        repositories::quizzes::CreateQuizResult {
            id: &Uuid::new_v4().to_string(),
            student_id: &student.id,
            score,
            total,
            taken_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record quiz result"))?;

    tracing::info!(
        student_id = %student.id,
        score = result.score,
        total = result.total,
        "Student submitted quiz answers"
    );

    Ok(Json(QuizScoreResponse {
        score: result.score,
        total: result.total,
        message: format!("You scored {} out of {}", result.score, result.total),
    }))
}

/// Case-insensitive comparison with surrounding whitespace ignored.
fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().eq_ignore_ascii_case(expected.trim())
}

#[cfg(test)]
mod tests {
    use super::answers_match;

    #[test]
    fn matching_ignores_case_and_whitespace() {
        assert!(answers_match("Paris", "paris"));
        assert!(answers_match("  paris  ", "Paris"));
        assert!(answers_match("42", "42"));
    }

    #[test]
    fn different_answers_do_not_match() {
        assert!(!answers_match("London", "Paris"));
        assert!(!answers_match("", "Paris"));
    }
}
