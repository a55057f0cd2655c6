// src/handlers/students.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    config::{Config, UNASSIGNED_TEAM},
    db,
    error::{AppError, is_unique_violation},
    models::student::{
        AssignTeamRequest, CreateStudentRequest, ResetPasswordRequest, StudentListItem,
        UpdateStudentRequest, normalize_handle,
    },
    utils::{
        access::{Action, Identity, Role, authorize},
        hash::hash_password,
    },
};

fn ensure_team(config: &Config, team: &str) -> Result<(), AppError> {
    if config.is_valid_team(team) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Unknown team '{}'. Expected '{}', '{}' or '{}'",
            team, config.team_a, config.team_b, UNASSIGNED_TEAM
        )))
    }
}

/// Lists all students with their team, ordered by name.
pub async fn list_students(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let students = sqlx::query_as::<_, StudentListItem>(
        "SELECT id, name, team FROM students ORDER BY name, id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

/// Creates a student. Admin only.
///
/// An initial password is optional; whoever receives one must replace it on first login.
pub async fn create_student(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageStudents, None).into_result()?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let team = payload.team.as_deref().unwrap_or(UNASSIGNED_TEAM);
    ensure_team(&config, team)?;

    let role = payload.role.as_deref().and_then(Role::parse).unwrap_or(Role::Student);
    let handle = normalize_handle(&payload.handle);
    let name = payload.name.trim().to_string();

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    if db::find_student_by_handle(&pool, &handle).await?.is_some() {
        return Err(AppError::Conflict(format!("Handle '{}' already exists", handle)));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO students (name, handle, team, password_hash, role, must_change_password)
        VALUES (?, ?, ?, ?, ?, TRUE)
        RETURNING id
        "#,
    )
    .bind(&name)
    .bind(&handle)
    .bind(team)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Handle '{}' already exists", handle))
        } else {
            tracing::error!("Failed to create student: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Admin {} created student {} ({})", identity.student_id, id, handle);

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Edits name, handle and/or team. Admin only.
pub async fn update_student(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageStudents, None).into_result()?;
    payload.validate()?;

    if let Some(team) = payload.team.as_deref() {
        ensure_team(&config, team)?;
    }

    let mut tx = pool.begin().await?;

    db::find_student(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    if payload.name.is_none() && payload.handle.is_none() && payload.team.is_none() {
        return Ok(StatusCode::OK);
    }

    let handle = payload.handle.as_deref().map(normalize_handle);

    if let Some(handle) = handle.as_deref() {
        let taken: Option<i64> =
            sqlx::query_scalar("SELECT id FROM students WHERE handle = ? AND id <> ?")
                .bind(handle)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Another student already uses handle '{}'",
                handle
            )));
        }
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE students SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    if let Some(handle) = handle {
        separated.push("handle = ");
        separated.push_bind_unseparated(handle);
    }

    if let Some(team) = payload.team {
        separated.push("team = ");
        separated.push_bind_unseparated(team);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to update student: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!("Admin {} updated student {}", identity.student_id, id);

    Ok(StatusCode::OK)
}

/// Moves a student to a team (or to 'unassigned'). Admin only.
pub async fn assign_team(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::AssignTeam, None).into_result()?;
    ensure_team(&config, &payload.team)?;

    let result = sqlx::query("UPDATE students SET team = ? WHERE id = ?")
        .bind(&payload.team)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!("Student {} moved to team '{}'", id, payload.team);

    Ok(StatusCode::OK)
}

/// Sets a new temporary password and signs the student out everywhere. Admin only.
pub async fn reset_password(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageStudents, None).into_result()?;
    payload.validate()?;

    let hashed = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE students SET password_hash = ?, must_change_password = TRUE WHERE id = ?",
    )
    .bind(hashed)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    sqlx::query("DELETE FROM sessions WHERE student_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Admin {} reset the password of student {}", identity.student_id, id);

    Ok(StatusCode::OK)
}

/// Deletes a student and everything that belongs to them, atomically.
/// Admin only. Prevents deleting self.
pub async fn delete_student(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageStudents, None).into_result()?;

    if id == identity.student_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let mut tx = pool.begin().await?;

    db::find_student(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    for statement in [
        "DELETE FROM sessions WHERE student_id = ?",
        "DELETE FROM exam_results WHERE student_id = ?",
        "DELETE FROM practice_logs WHERE student_id = ?",
        "DELETE FROM students WHERE id = ?",
    ] {
        sqlx::query(statement)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete student {}: {:?}", id, e);
                AppError::from(e)
            })?;
    }

    tx.commit().await?;

    tracing::info!("Admin {} deleted student {} and their history", identity.student_id, id);

    Ok(StatusCode::NO_CONTENT)
}
