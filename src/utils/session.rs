// src/utils/session.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    db,
    error::AppError,
    state::AppState,
    utils::access::Identity,
};

/// Session token claims.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the student id (as string).
    pub sub: String,
    /// Server-side session id; the token is only honoured while that row exists.
    pub sid: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn student_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// A freshly opened session.
pub struct IssuedSession {
    pub session_id: String,
    pub token: String,
}

/// Persists a new session for `student_id` and signs a bearer token bound to it.
pub async fn open_session(state: &AppState, student_id: i64) -> Result<IssuedSession, AppError> {
    let now = Utc::now();
    let expires_at = session_expiry(now, state.config.jwt_expiration).ok_or_else(|| {
        AppError::InternalServerError(format!(
            "Session lifetime of {}s is out of range",
            state.config.jwt_expiration
        ))
    })?;
    let session_id = uuid::Uuid::new_v4().to_string();

    db::create_session(&state.pool, &session_id, student_id, now, expires_at).await?;

    let claims = Claims {
        sub: student_id.to_string(),
        sid: session_id.clone(),
        exp: usize::try_from(expires_at.timestamp()).unwrap_or(usize::MAX),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(IssuedSession { session_id, token })
}

/// `now + lifetime_secs`, or `None` when that instant is not representable.
pub fn session_expiry(now: DateTime<Utc>, lifetime_secs: u64) -> Option<DateTime<Utc>> {
    let lifetime = Duration::try_seconds(i64::try_from(lifetime_secs).ok()?)?;
    now.checked_add_signed(lifetime)
}

/// Verifies the signature and expiry of a bearer token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolves a bearer token to a live session identity, if any.
pub async fn resolve_identity(
    state: &AppState,
    token: &str,
) -> Result<Option<(Claims, Identity)>, AppError> {
    let Ok(claims) = verify_token(token, &state.config.jwt_secret) else {
        return Ok(None);
    };
    let Some(student_id) = claims.student_id() else {
        return Ok(None);
    };

    let identity = db::load_identity(&state.pool, &claims.sid, student_id, Utc::now()).await?;
    Ok(identity.map(|identity| (claims, identity)))
}

/// Axum Middleware: Authentication.
///
/// Resolves the bearer token to a live session and injects both the `Claims`
/// and the `Identity` into the request extensions. Anonymous requests get 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let resolved = match token {
        Some(token) => resolve_identity(&state, &token).await?,
        None => None,
    };

    match resolved {
        Some((claims, identity)) => {
            req.extensions_mut().insert(claims);
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        None => Err(AppError::AuthError("Authentication required".to_string())),
    }
}

/// Axum Middleware: first-login gate.
///
/// Must be used AFTER `auth_middleware`. Accounts still flagged with a
/// temporary password are held at the password-change flow.
pub async fn password_gate_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AppError::AuthError("Authentication required".to_string()))?;

    if identity.must_change_password {
        return Err(AppError::PasswordChangeRequired);
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Anything but an admin gets 403;
/// handlers still run the access gate for their specific action.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AppError::AuthError("Authentication required".to_string()))?;

    if !identity.is_admin() {
        tracing::warn!(
            "Admin route {} denied for student {}",
            req.uri().path(),
            identity.student_id
        );
        return Err(AppError::Forbidden("Administrator role required".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SESSION_SECS;
    use chrono::TimeZone;

    #[test]
    fn expiry_adds_the_lifetime() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
        assert_eq!(session_expiry(now, 600), Some(now + Duration::seconds(600)));
        assert!(session_expiry(now, MAX_SESSION_SECS).is_some());
    }

    #[test]
    fn oversized_lifetimes_do_not_overflow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
        assert_eq!(session_expiry(now, u64::MAX), None);
        assert_eq!(session_expiry(now, i64::MAX as u64), None);
        assert_eq!(session_expiry(DateTime::<Utc>::MAX_UTC, 1), None);
    }
}
