use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::validation::validate_upload_filename;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::course::CourseResponse;
use crate::services::storage::StorageService;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course))
}

async fn list_courses(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(course)))
}

async fn create_course(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let mut title: Option<String> = None;
    let mut description = String::new();
    let mut pending_files: Vec<(String, Vec<u8>)> = Vec::new();
    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid title field".to_string()))?;
                title = Some(text);
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid description field".to_string()))?;
            }
            "files" => {
                let filename = field.file_name().unwrap_or("").to_string();
                validate_upload_filename(&filename)?;

                let bytes = read_field_bytes(field, max_bytes, state.settings()).await?;
                pending_files.push((filename, bytes));
            }
            _ => {}
        }
    }

    let title = title
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Course title must not be empty".to_string()))?;

    // Nothing reaches storage until the metadata fields have validated.
    let mut stored_files = Vec::with_capacity(pending_files.len());
    for (filename, bytes) in pending_files {
        let stored_name = StorageService::versioned_name(&filename);
        state
            .storage()
            .store(&stored_name, bytes)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to store course file"))?;
        stored_files.push(stored_name);
    }

    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: &title,
            description: description.trim(),
            files: stored_files,
            created_by: &admin.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course.id,
        files = course.files.0.len(),
        "Admin uploaded course"
    );

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

pub(crate) async fn read_field_bytes(
    mut field: axum::extract::multipart::Field<'_>,
    max_bytes: u64,
    settings: &crate::core::config::Settings,
) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
    {
        let next_size = bytes.len() as u64 + chunk.len() as u64;
        if next_size > max_bytes {
            return Err(ApiError::BadRequest(format!(
                "File size exceeds {}MB limit",
                settings.storage().max_upload_size_mb
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
