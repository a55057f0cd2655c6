// src/handlers/reports.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::{self, LogScope},
    error::AppError,
    models::report::{LastWeekResponse, PerformanceParams, PerformanceResponse, RankingsResponse},
    scoring::{
        aggregate::{leaderboard_by_accuracy, leaderboard_by_volume, student_summary},
        battle::resolve_battle,
        week::{TimeWindow, current_week, last_week},
    },
};

/// Both boards over `window`.
async fn rankings(
    pool: &SqlitePool,
    window: &TimeWindow,
    min_volume: i64,
    limit: Option<usize>,
) -> Result<RankingsResponse, AppError> {
    let logs = db::fetch_logs(pool, window, &LogScope::All).await?;

    Ok(RankingsResponse {
        by_volume: leaderboard_by_volume(&logs, window, limit),
        by_accuracy: leaderboard_by_accuracy(&logs, window, min_volume, limit),
        period: None,
    })
}

/// Current-week volume and accuracy boards.
pub async fn weekly_rankings(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let window = current_week(Utc::now());
    let mut response = rankings(
        &pool,
        &window,
        config.accuracy_min_volume,
        Some(config.leaderboard_limit),
    )
    .await?;
    response.period = Some(window.period());

    Ok(Json(response))
}

/// All-time boards, uncapped. Anyone with at least one question qualifies for accuracy.
pub async fn overall_rankings(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let response = rankings(&pool, &TimeWindow::all_time(), 0, None).await?;
    Ok(Json(response))
}

/// The frozen previous week: boards, team battle and period.
pub async fn last_week_report(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let window = last_week(Utc::now());
    let logs = db::fetch_logs(&pool, &window, &LogScope::All).await?;
    let limit = Some(config.leaderboard_limit);

    Ok(Json(LastWeekResponse {
        by_volume: leaderboard_by_volume(&logs, &window, limit),
        by_accuracy: leaderboard_by_accuracy(&logs, &window, config.accuracy_min_volume, limit),
        battle: resolve_battle(&logs, &config.team_a, &config.team_b, &window),
        period: window.period(),
    }))
}

/// The live battle for the current week.
pub async fn live_battle(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let window = current_week(Utc::now());
    let scope = LogScope::Teams(vec![config.team_a.clone(), config.team_b.clone()]);
    let logs = db::fetch_logs(&pool, &window, &scope).await?;

    Ok(Json(resolve_battle(
        &logs,
        &config.team_a,
        &config.team_b,
        &window,
    )))
}

/// Totals and daily series for one student between two local dates (inclusive).
pub async fn student_performance(
    State(pool): State<SqlitePool>,
    Query(params): Query<PerformanceParams>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(student_id), Some(from), Some(to)) = (params.student_id, params.from, params.to)
    else {
        return Err(AppError::BadRequest(
            "Parameters student_id, from and to are required".to_string(),
        ));
    };

    if from > to {
        return Err(AppError::BadRequest("'from' must not be after 'to'".to_string()));
    }

    let window = TimeWindow::local_days(from, to)
        .ok_or(AppError::BadRequest("Date range is out of bounds".to_string()))?;

    let student = db::find_student(&pool, student_id)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;
    let logs = db::fetch_logs(&pool, &window, &LogScope::Student(student_id)).await?;
    let summary = student_summary(&logs, student_id, &window);

    Ok(Json(PerformanceResponse::new(
        student_id,
        student.name,
        from,
        to,
        summary,
    )))
}
