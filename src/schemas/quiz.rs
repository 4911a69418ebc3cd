use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::models::Quiz;

/// Quiz as shown to a student; the stored answer never leaves the server.
#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        Self { id: quiz.id, question: quiz.question, options: quiz.options.0 }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizSubmission {
    /// Maps quiz id to the submitted answer value.
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizScoreResponse {
    pub(crate) score: i32,
    pub(crate) total: i32,
    pub(crate) message: String,
}
