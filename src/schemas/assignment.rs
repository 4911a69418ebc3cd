use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Assignment;

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) filename: String,
    pub(crate) original_filename: String,
    pub(crate) submitted_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            course_id: assignment.course_id,
            filename: assignment.filename,
            original_filename: assignment.original_filename,
            submitted_at: format_primitive(assignment.submitted_at),
        }
    }
}
