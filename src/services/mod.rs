pub(crate) mod mailer;
pub(crate) mod storage;
