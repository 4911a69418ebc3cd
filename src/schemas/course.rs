use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Course;

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    /// Stored filenames in upload order; serve through `/files/{name}`.
    pub(crate) files: Vec<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            files: course.files.0,
            created_by: course.created_by,
            created_at: format_primitive(course.created_at),
        }
    }
}
