use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:stored_name", get(download))
}

async fn download(
    Path(stored_name): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    // Traversal-looking names can never match a stored file
    if stored_name.contains("..") || stored_name.contains(['/', '\\']) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let bytes = state
        .storage()
        .retrieve(&stored_name)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to read stored file"))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    let disposition = format!("attachment; filename=\"{stored_name}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    Ok((headers, bytes))
}
