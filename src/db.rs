// src/db.rs

//! Read queries shared by several handlers.
//!
//! Single-purpose CRUD statements live next to their handlers; what is here is
//! reused across endpoints (log snapshots for the scoring engine, student and
//! session lookups for the auth layer).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::{
    models::student::Student,
    scoring::{aggregate::LogRecord, week::TimeWindow},
    utils::access::{Identity, Role},
};

/// Which practice logs a snapshot should contain.
#[derive(Debug, Clone)]
pub enum LogScope {
    All,
    Student(i64),
    /// Logs of students currently assigned to any of these teams.
    Teams(Vec<String>),
}

#[derive(Debug, FromRow)]
struct LogRow {
    student_id: i64,
    student_name: String,
    team: String,
    question_count: i64,
    correct_count: i64,
    logged_at: i64,
}

impl From<LogRow> for LogRecord {
    fn from(row: LogRow) -> Self {
        LogRecord {
            student_id: row.student_id,
            student_name: row.student_name,
            team: row.team,
            question_count: row.question_count,
            correct_count: row.correct_count,
            logged_at: from_unix(row.logged_at),
        }
    }
}

pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Logs inside `window` (both ends inclusive) joined with their owner's current name and team.
pub async fn fetch_logs(
    pool: &SqlitePool,
    window: &TimeWindow,
    scope: &LogScope,
) -> Result<Vec<LogRecord>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            p.student_id,
            s.name AS student_name,
            s.team,
            p.question_count,
            p.correct_count,
            p.logged_at
        FROM practice_logs p
        JOIN students s ON s.id = p.student_id
        WHERE p.logged_at BETWEEN "#,
    );
    builder.push_bind(window.from.timestamp());
    builder.push(" AND ");
    builder.push_bind(window.to.timestamp());

    match scope {
        LogScope::All => {}
        LogScope::Student(id) => {
            builder.push(" AND p.student_id = ");
            builder.push_bind(*id);
        }
        LogScope::Teams(teams) => {
            builder.push(" AND s.team IN (");
            let mut separated = builder.separated(", ");
            for team in teams {
                separated.push_bind(team.clone());
            }
            separated.push_unseparated(")");
        }
    }

    builder.push(" ORDER BY p.logged_at, p.id");

    let rows: Vec<LogRow> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(LogRecord::from).collect())
}

pub async fn find_student<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        r#"
        SELECT id, name, handle, team, password_hash, role, must_change_password
        FROM students
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_student_by_handle(
    pool: &SqlitePool,
    handle: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        r#"
        SELECT id, name, handle, team, password_hash, role, must_change_password
        FROM students
        WHERE handle = ?
        "#,
    )
    .bind(handle)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, FromRow)]
struct IdentityRow {
    student_id: i64,
    name: String,
    role: String,
    must_change_password: bool,
}

/// Resolves a live session to the identity of its student, re-reading role and flags.
pub async fn load_identity(
    pool: &SqlitePool,
    session_id: &str,
    student_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<Identity>, sqlx::Error> {
    let row = sqlx::query_as::<_, IdentityRow>(
        r#"
        SELECT s.id AS student_id, s.name, s.role, s.must_change_password
        FROM sessions ss
        JOIN students s ON s.id = ss.student_id
        WHERE ss.id = ? AND ss.student_id = ? AND ss.expires_at > ?
        "#,
    )
    .bind(session_id)
    .bind(student_id)
    .bind(now.timestamp())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Identity {
        student_id: r.student_id,
        name: r.name,
        role: Role::parse(&r.role).unwrap_or(Role::Student),
        must_change_password: r.must_change_password,
    }))
}

pub async fn create_session(
    pool: &SqlitePool,
    session_id: &str,
    student_id: i64,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions (id, student_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(student_id)
    .bind(now.timestamp())
    .bind(expires_at.timestamp())
    .execute(pool)
    .await?;

    // Opportunistic cleanup of sessions that can no longer authenticate.
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now.timestamp())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
