// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::{
    config::RECENT_RESULTS_LIMIT,
    db,
    error::{AppError, is_unique_violation},
    models::exam::{
        CreateExamResultRequest, CreateMockExamRequest, CreateProviderRequest, ExamProvider,
        ExamRankingEntry, MockExam, MockExamListItem, RecentResultEntry, display_name,
    },
    utils::access::{Action, Identity, authorize},
};

const MOCK_EXAM_COLUMNS: &str = r#"
    SELECT
        m.id,
        m.provider_id,
        p.name AS provider_name,
        m.number,
        m.label,
        m.category,
        m.held_on
    FROM mock_exams m
    JOIN exam_providers p ON p.id = m.provider_id
"#;

/// Lists exam providers by name.
pub async fn list_providers(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let providers =
        sqlx::query_as::<_, ExamProvider>("SELECT id, name FROM exam_providers ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(providers))
}

/// Creates an exam provider. Admin only.
pub async fn create_provider(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateProviderRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageExams, None).into_result()?;
    payload.validate()?;

    let name = payload.name.trim().to_string();

    let provider = sqlx::query_as::<_, ExamProvider>(
        "INSERT INTO exam_providers (name) VALUES (?) RETURNING id, name",
    )
    .bind(&name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Provider '{}' already exists", name))
        } else {
            tracing::error!("Failed to create provider: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(
        "Admin {} created provider {} ({})",
        identity.student_id,
        provider.id,
        provider.name
    );

    Ok((StatusCode::CREATED, Json(provider)))
}

/// Deletes a provider that no longer has mock exams. Admin only.
pub async fn delete_provider(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageExams, None).into_result()?;

    let mut tx = pool.begin().await?;

    let exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mock_exams WHERE provider_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    if exams > 0 {
        return Err(AppError::Conflict(format!(
            "Provider still has {} mock exam(s)",
            exams
        )));
    }

    let result = sqlx::query("DELETE FROM exam_providers WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Provider not found".to_string()));
    }

    tx.commit().await?;

    tracing::info!("Admin {} deleted provider {}", identity.student_id, id);

    Ok(StatusCode::NO_CONTENT)
}

/// Lists mock exams, newest first, with their display names.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, MockExam>(&format!(
        "{MOCK_EXAM_COLUMNS} ORDER BY m.held_on DESC, m.id DESC"
    ))
    .fetch_all(&pool)
    .await?;

    let items: Vec<MockExamListItem> = exams
        .into_iter()
        .map(MockExamListItem::from)
        .collect();

    Ok(Json(items))
}

/// Creates a mock exam identified by either a number or a label. Admin only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateMockExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageExams, None).into_result()?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (Some(provider_id), Some(category), Some(held_on)) =
        (payload.provider_id, payload.category, payload.held_on)
    else {
        return Err(AppError::BadRequest("Incomplete mock exam".to_string()));
    };

    let label = match payload.number {
        Some(_) => None,
        None => payload.label.map(|l| l.trim().to_string()),
    };

    let mut tx = pool.begin().await?;

    let provider: Option<i64> = sqlx::query_scalar("SELECT id FROM exam_providers WHERE id = ?")
        .bind(provider_id)
        .fetch_optional(&mut *tx)
        .await?;

    if provider.is_none() {
        return Err(AppError::NotFound("Provider not found".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO mock_exams (provider_id, number, label, category, held_on)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(provider_id)
    .bind(payload.number)
    .bind(label)
    .bind(category.trim())
    .bind(held_on)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create mock exam: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(
        "Admin {} created mock exam {} for provider {}",
        identity.student_id,
        id,
        provider_id
    );

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a mock exam together with its results. Admin only.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(Some(&identity), Action::ManageExams, None).into_result()?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM exam_results WHERE exam_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM mock_exams WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Mock exam not found".to_string()));
    }

    tx.commit().await?;

    tracing::info!(
        "Admin {} deleted mock exam {} and its results",
        identity.student_id,
        id
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Records a student's score on a mock exam. One result per (student, exam).
pub async fn create_result(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateExamResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (Some(student_id), Some(exam_id), Some(score)) =
        (payload.student_id, payload.exam_id, payload.score)
    else {
        return Err(AppError::BadRequest("Incomplete exam result".to_string()));
    };

    authorize(Some(&identity), Action::RecordExamResult, Some(student_id)).into_result()?;

    let mut tx = pool.begin().await?;

    db::find_student(&mut *tx, student_id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let exam: Option<i64> = sqlx::query_scalar("SELECT id FROM mock_exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(&mut *tx)
        .await?;

    if exam.is_none() {
        return Err(AppError::NotFound("Mock exam not found".to_string()));
    }

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM exam_results WHERE student_id = ? AND exam_id = ?")
            .bind(student_id)
            .bind(exam_id)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "This student already has a score for this mock exam".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO exam_results (student_id, exam_id, score) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(score)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This student already has a score for this mock exam".to_string())
        } else {
            tracing::error!("Failed to insert exam result: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes an exam result. Owner or admin only.
pub async fn delete_result(
    State(pool): State<SqlitePool>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let owner: i64 = sqlx::query_scalar("SELECT student_id FROM exam_results WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Exam result not found".to_string()))?;

    authorize(Some(&identity), Action::DeleteExamResult, Some(owner)).into_result()?;

    sqlx::query("DELETE FROM exam_results WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(FromRow)]
struct RecentResultRow {
    id: i64,
    student_id: i64,
    student_name: String,
    provider_name: String,
    number: Option<i64>,
    label: Option<String>,
    category: String,
    score: f64,
}

/// The most recent exam results with student and exam display names.
pub async fn recent_results(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, RecentResultRow>(
        r#"
        SELECT
            r.id,
            r.student_id,
            s.name AS student_name,
            p.name AS provider_name,
            m.number,
            m.label,
            m.category,
            r.score
        FROM exam_results r
        JOIN students s ON s.id = r.student_id
        JOIN mock_exams m ON m.id = r.exam_id
        JOIN exam_providers p ON p.id = m.provider_id
        ORDER BY r.id DESC
        LIMIT ?
        "#,
    )
    .bind(RECENT_RESULTS_LIMIT)
    .fetch_all(&pool)
    .await?;

    let entries: Vec<RecentResultEntry> = rows
        .into_iter()
        .map(|row| RecentResultEntry {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            exam_name: display_name(
                &row.provider_name,
                row.number,
                row.label.as_deref(),
                &row.category,
            ),
            score: row.score,
        })
        .collect();

    Ok(Json(entries))
}

/// All results of one mock exam, best score first.
pub async fn exam_ranking(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam: Option<i64> = sqlx::query_scalar("SELECT id FROM mock_exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?;

    if exam.is_none() {
        return Err(AppError::NotFound("Mock exam not found".to_string()));
    }

    let ranking = sqlx::query_as::<_, ExamRankingEntry>(
        r#"
        SELECT r.student_id, s.name AS student_name, r.score
        FROM exam_results r
        JOIN students s ON s.id = r.student_id
        WHERE r.exam_id = ?
        ORDER BY r.score DESC, s.name, s.id
        "#,
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ranking))
}
