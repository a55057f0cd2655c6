// src/models/report.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scoring::{
    aggregate::{AccuracyEntry, DailyEntry, StudentSummary, VolumeEntry},
    battle::TeamBattle,
    week::Period,
};

/// Volume and accuracy boards over the same window.
#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub by_volume: Vec<VolumeEntry>,
    pub by_accuracy: Vec<AccuracyEntry>,
    pub period: Option<Period>,
}

/// Frozen previous-week snapshot: boards plus the battle.
#[derive(Debug, Serialize)]
pub struct LastWeekResponse {
    pub by_volume: Vec<VolumeEntry>,
    pub by_accuracy: Vec<AccuracyEntry>,
    pub battle: TeamBattle,
    pub period: Period,
}

/// Query parameters for the performance lookup. Dates are local calendar days.
#[derive(Debug, Deserialize)]
pub struct PerformanceParams {
    pub student_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub student_id: i64,
    pub student_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_questions: i64,
    pub total_correct: i64,
    pub accuracy_pct: f64,
    pub daily_breakdown: Vec<DailyEntry>,
}

impl PerformanceResponse {
    pub fn new(
        student_id: i64,
        student_name: String,
        from: NaiveDate,
        to: NaiveDate,
        summary: StudentSummary,
    ) -> Self {
        Self {
            student_id,
            student_name,
            from,
            to,
            total_questions: summary.total_questions,
            total_correct: summary.total_correct,
            accuracy_pct: summary.accuracy_pct,
            daily_breakdown: summary.daily_breakdown,
        }
    }
}
