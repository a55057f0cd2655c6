// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db,
    error::{AppError, CHANGE_PASSWORD_PATH},
    models::student::{
        ChangePasswordRequest, LoginRequest, LoginResponse, Student, normalize_handle,
    },
    state::AppState,
    utils::{
        access::{Identity, Role},
        hash::{hash_password, verify_password},
        session::{bearer_token, open_session, verify_token},
    },
};

/// Why a login attempt was refused. Every variant fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No student with that handle, or the student has no password set.
    NotFoundOrNoCredential,
    WrongSecret,
    /// The stored hash cannot be parsed. A server fault, never a login.
    UnreadableCredential,
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::NotFoundOrNoCredential => {
                AppError::AuthError("User not found or no password set".to_string())
            }
            AuthFailure::WrongSecret => AppError::AuthError("Invalid password".to_string()),
            AuthFailure::UnreadableCredential => {
                AppError::InternalServerError("Stored credential is unreadable".to_string())
            }
        }
    }
}

/// Checks a submitted secret against the student record the handle resolved to.
pub fn verify_credentials(
    student: Option<Student>,
    secret: &str,
) -> Result<Identity, AuthFailure> {
    let student = student.ok_or(AuthFailure::NotFoundOrNoCredential)?;
    let hash = student
        .password_hash
        .as_deref()
        .ok_or(AuthFailure::NotFoundOrNoCredential)?;

    match verify_password(secret, hash) {
        Ok(true) => Ok(Identity {
            student_id: student.id,
            name: student.name,
            role: Role::parse(&student.role).unwrap_or(Role::Student),
            must_change_password: student.must_change_password,
        }),
        Ok(false) => Err(AuthFailure::WrongSecret),
        Err(e) => {
            tracing::error!("Stored hash for student {} is unreadable: {}", student.id, e);
            Err(AuthFailure::UnreadableCredential)
        }
    }
}

/// Resolves `handle` and verifies `secret`; no session is created here.
pub async fn authenticate(
    pool: &SqlitePool,
    handle: &str,
    secret: &str,
) -> Result<Identity, AppError> {
    let handle = normalize_handle(handle);
    let student = db::find_student_by_handle(pool, &handle).await?;

    verify_credentials(student, secret).map_err(|failure| {
        tracing::warn!("Failed login for handle '{}': {:?}", handle, failure);
        AppError::from(failure)
    })
}

/// Authenticates a student and opens a session.
///
/// Students still on a temporary password get the token together with a
/// redirect to the password-change flow.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let identity = authenticate(&state.pool, &payload.handle, &payload.password).await?;
    let session = open_session(&state, identity.student_id).await?;

    tracing::info!(
        "Student {} logged in (session {})",
        identity.student_id,
        session.session_id
    );

    let redirect = identity.must_change_password.then_some(CHANGE_PASSWORD_PATH);

    Ok(Json(LoginResponse {
        token: session.token,
        token_type: "Bearer",
        identity,
        redirect,
    }))
}

/// Ends the caller's session. Always succeeds, even without a valid token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let claims = bearer_token(&headers)
        .and_then(|token| verify_token(token, &state.config.jwt_secret).ok());

    if let Some(claims) = claims {
        let removed = db::delete_session(&state.pool, &claims.sid).await?;
        if removed > 0 {
            tracing::info!("Session {} closed", claims.sid);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the identity bound to the current session.
pub async fn me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(identity)
}

/// Replaces the caller's password and clears the first-login flag.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let student = db::find_student(&pool, identity.student_id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    if let Some(current_hash) = student.password_hash.as_deref() {
        let current = payload.current_password.as_deref().unwrap_or_default();
        if !verify_password(current, current_hash)? {
            return Err(AppError::AuthError("Current password is incorrect".to_string()));
        }
        if current == payload.new_password {
            return Err(AppError::BadRequest(
                "New password must differ from the current one".to_string(),
            ));
        }
    }

    let hashed = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE students SET password_hash = ?, must_change_password = FALSE WHERE id = ?")
        .bind(hashed)
        .bind(identity.student_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to change password: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!("Student {} changed their password", identity.student_id);

    Ok(Json(json!({ "status": "password updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(hash: Option<String>) -> Student {
        Student {
            id: 3,
            name: "Ana".to_string(),
            handle: "ana".to_string(),
            team: "Alpha".to_string(),
            password_hash: hash,
            role: "student".to_string(),
            must_change_password: true,
        }
    }

    #[test]
    fn unknown_handle_fails_closed() {
        assert_eq!(
            verify_credentials(None, "x"),
            Err(AuthFailure::NotFoundOrNoCredential)
        );
    }

    #[test]
    fn student_without_credential_cannot_log_in() {
        assert_eq!(
            verify_credentials(Some(student(None)), "x"),
            Err(AuthFailure::NotFoundOrNoCredential)
        );
    }

    #[test]
    fn wrong_secret_is_distinguished() {
        let hash = hash_password("right").unwrap();
        assert_eq!(
            verify_credentials(Some(student(Some(hash))), "wrong"),
            Err(AuthFailure::WrongSecret)
        );
    }

    #[test]
    fn malformed_stored_hash_is_a_server_fault() {
        let stored = student(Some("plaintext".to_string()));
        let failure = verify_credentials(Some(stored), "plaintext");
        assert_eq!(failure, Err(AuthFailure::UnreadableCredential));
        assert!(matches!(
            AppError::from(AuthFailure::UnreadableCredential),
            AppError::InternalServerError(_)
        ));
    }

    #[test]
    fn correct_secret_yields_identity() {
        let hash = hash_password("right").unwrap();
        let identity = verify_credentials(Some(student(Some(hash))), "right").unwrap();
        assert_eq!(identity.student_id, 3);
        assert_eq!(identity.role, Role::Student);
        assert!(identity.must_change_password);
    }
}
