pub(crate) mod assignments;
pub(crate) mod auth;
pub(crate) mod chatbot;
pub(crate) mod courses;
pub(crate) mod errors;
pub(crate) mod files;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod validation;
