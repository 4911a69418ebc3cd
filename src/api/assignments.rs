use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::courses::read_field_bytes;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::validation::validate_upload_filename;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::assignment::AssignmentResponse;
use crate::services::storage::StorageService;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/mine", get(list_mine)).route("/:course_id", post(submit))
}

async fn submit(
    Path(course_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;

    if course.is_none() {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "assignment" || name == "file" {
            original_filename = field.file_name().map(|value| value.to_string());
            file_bytes = Some(read_field_bytes(field, max_bytes, state.settings()).await?);
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Assignment file is required".to_string()))?;
    let original_filename = original_filename.unwrap_or_default();
    validate_upload_filename(&original_filename)?;

    // Versioned stored name: a re-submission adds a row and new bytes,
    // it never overwrites what an earlier row references.
    let stored_name = StorageService::versioned_name(&original_filename);
    state
        .storage()
        .store(&stored_name, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store assignment file"))?;

    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            student_id: &student.id,
            course_id: &course_id,
            filename: &stored_name,
            original_filename: &original_filename,
            submitted_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record assignment"))?;

    tracing::info!(
        student_id = %student.id,
        course_id = %course_id,
        assignment_id = %assignment.id,
        "Student submitted assignment"
    );

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

async fn list_mine(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let assignments = repositories::assignments::list_by_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    Ok(Json(assignments.into_iter().map(AssignmentResponse::from_db).collect()))
}
