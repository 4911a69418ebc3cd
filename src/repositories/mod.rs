pub(crate) mod assignments;
pub(crate) mod courses;
pub(crate) mod quizzes;
pub(crate) mod users;
