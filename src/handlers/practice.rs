// src/handlers/practice.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::{
    config::RECENT_LOGS_LIMIT,
    db::{self, from_unix},
    error::AppError,
    models::practice_log::{CreatePracticeLogRequest, RecentLogEntry},
    utils::access::{Action, Identity, authorize},
};

/// Records a practice session for a student, stamped with the current time.
///
/// Students may only log for themselves; admins may log on behalf of anyone.
pub async fn create_log(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreatePracticeLogRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (Some(student_id), Some(question_count), Some(correct_count)) =
        (payload.student_id, payload.question_count, payload.correct_count)
    else {
        return Err(AppError::BadRequest("Incomplete practice log".to_string()));
    };

    let decision = authorize(Some(&identity), Action::LogPractice, Some(student_id));
    if let Err(denied) = decision.into_result() {
        tracing::warn!(
            "Student {} tried to log practice for student {}",
            identity.student_id,
            student_id
        );
        return Err(denied);
    }

    let mut tx = pool.begin().await?;

    db::find_student(&mut *tx, student_id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO practice_logs (student_id, question_count, correct_count, logged_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(question_count)
    .bind(correct_count)
    .bind(Utc::now().timestamp())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert practice log: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a practice log. Owner or admin only.
pub async fn delete_log(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let owner: i64 = sqlx::query_scalar("SELECT student_id FROM practice_logs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Practice log not found".to_string()))?;

    authorize(Some(&identity), Action::DeletePracticeLog, Some(owner)).into_result()?;

    sqlx::query("DELETE FROM practice_logs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete practice log: {:?}", e);
            AppError::from(e)
        })?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(FromRow)]
struct RecentLogRow {
    id: i64,
    student_id: i64,
    student_name: String,
    question_count: i64,
    correct_count: i64,
    logged_at: i64,
}

/// The most recent practice logs across all students.
pub async fn recent_logs(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, RecentLogRow>(
        r#"
        SELECT
            p.id,
            p.student_id,
            s.name AS student_name,
            p.question_count,
            p.correct_count,
            p.logged_at
        FROM practice_logs p
        JOIN students s ON s.id = p.student_id
        ORDER BY p.id DESC
        LIMIT ?
        "#,
    )
    .bind(RECENT_LOGS_LIMIT)
    .fetch_all(&pool)
    .await?;

    let entries: Vec<RecentLogEntry> = rows
        .into_iter()
        .map(|row| RecentLogEntry {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            question_count: row.question_count,
            correct_count: row.correct_count,
            logged_at: from_unix(row.logged_at),
        })
        .collect();

    Ok(Json(entries))
}
