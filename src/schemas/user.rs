use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserRegister {
    #[serde(alias = "fullName")]
    #[validate(custom(function = validate_not_blank, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(default = "default_user_role")]
    pub(crate) role: UserRole,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_verified: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_verified: user.is_verified,
            created_at: format_primitive(user.created_at),
        }
    }
}

fn default_user_role() -> UserRole {
    UserRole::Student
}

// Whitespace-only names collapse to "" after the trim at insert time
fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_payload(full_name: &str) -> UserRegister {
        UserRegister {
            full_name: full_name.to_string(),
            email: "student@example.com".to_string(),
            password: "password123".to_string(),
            role: UserRole::Student,
        }
    }

    #[test]
    fn blank_full_name_fails_validation() {
        assert!(register_payload("   ").validate().is_err());
        assert!(register_payload("").validate().is_err());
    }

    #[test]
    fn named_payload_passes_validation() {
        assert!(register_payload("Dana Scully").validate().is_ok());
    }
}
