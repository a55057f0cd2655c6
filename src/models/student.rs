// src/models/student.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::{access::Identity, html::validate_plain_text};

static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._-]{3,32}$").expect("handle pattern is valid"));

/// Represents the 'students' table in the database.
/// Admin accounts live in the same table with role 'admin'.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,

    pub name: String,

    /// Unique, lower-cased login handle.
    pub handle: String,

    /// One of the configured team labels, or 'unassigned'.
    pub team: String,

    /// Argon2 hash. `None` means the student cannot log in yet.
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// 'student' or 'admin'.
    pub role: String,

    pub must_change_password: bool,
}

/// Public directory row.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentListItem {
    pub id: i64,
    pub name: String,
    pub team: String,
}

/// Trims and lower-cases a login handle.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_handle(handle: &str) -> Result<(), validator::ValidationError> {
    if !HANDLE_PATTERN.is_match(&normalize_handle(handle)) {
        let mut err = validator::ValidationError::new("invalid_handle");
        err.message = Some(
            "Handle must be 3-32 characters of letters, digits, '.', '_' or '-'.".into(),
        );
        return Err(err);
    }
    Ok(())
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        "student" | "admin" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_role")),
    }
}

/// DTO for an admin creating a student.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name length must be between 1 and 100 characters."),
        custom(function = validate_plain_text)
    )]
    pub name: String,

    #[validate(custom(function = validate_handle))]
    pub handle: String,

    /// Initial password; the student must replace it on first login.
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: Option<String>,

    pub team: Option<String>,

    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
}

/// DTO for editing a student. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name length must be between 1 and 100 characters."),
        custom(function = validate_plain_text)
    )]
    pub name: Option<String>,

    #[validate(custom(function = validate_handle))]
    pub handle: Option<String>,

    pub team: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTeamRequest {
    pub team: String,
}

/// DTO for an admin resetting a student's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub handle: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub identity: Identity,
    /// Set while the account still has its temporary password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

/// DTO for the self-service password change.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(max = 128))]
    pub current_password: Option<String>,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_normalized_before_matching() {
        assert_eq!(normalize_handle("  Ana.Souza "), "ana.souza");
        assert!(validate_handle("  Ana.Souza ").is_ok());
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle("has space").is_err());
    }

    #[test]
    fn create_request_rejects_markup_names() {
        let req = CreateStudentRequest {
            name: "<script>x</script>".into(),
            handle: "ana".into(),
            password: None,
            team: None,
            role: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_rejects_unknown_role() {
        let req = CreateStudentRequest {
            name: "Ana".into(),
            handle: "ana".into(),
            password: Some("1234".into()),
            team: None,
            role: Some("root".into()),
        };
        assert!(req.validate().is_err());
    }
}
