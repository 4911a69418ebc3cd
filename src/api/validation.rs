use std::path::Path;

use crate::api::errors::ApiError;

pub(crate) fn validate_upload_filename(filename: &str) -> Result<(), ApiError> {
    if filename.trim().is_empty() {
        return Err(ApiError::BadRequest("Uploaded file must have a name".to_string()));
    }

    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    Ok(())
}
