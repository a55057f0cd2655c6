//! Aggregation over practice logs.
//!
//! Every function here is pure: it receives a snapshot of log records (usually
//! already narrowed by the database query) and a window, and re-applies the
//! window itself so results never depend on how the snapshot was fetched.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::week::{TimeWindow, local_date};

/// One practice log joined with its owner's current name and team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub student_id: i64,
    pub student_name: String,
    pub team: String,
    pub question_count: i64,
    pub correct_count: i64,
    pub logged_at: DateTime<Utc>,
}

/// Exact running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub questions: i64,
    pub correct: i64,
}

impl Tally {
    pub fn add(&mut self, log: &LogRecord) {
        self.questions += log.question_count;
        self.correct += log.correct_count;
    }

    pub fn accuracy_pct(&self) -> f64 {
        accuracy_pct(self.correct, self.questions)
    }

    /// Compares `correct / questions` exactly; an empty tally counts as 0%.
    fn cmp_accuracy(&self, other: &Tally) -> Ordering {
        match (self.questions > 0, other.questions > 0) {
            (true, true) => (i128::from(self.correct) * i128::from(other.questions))
                .cmp(&(i128::from(other.correct) * i128::from(self.questions))),
            (true, false) => {
                if self.correct > 0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
            (false, true) => other.cmp_accuracy(self).reverse(),
            (false, false) => Ordering::Equal,
        }
    }
}

/// `100 * correct / total` rounded to 2 decimals, clamped to `[0, 100]`; 0 when `total == 0`.
pub fn accuracy_pct(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = correct as f64 * 100.0 / total as f64;
    round2(pct.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub questions: i64,
    pub correct: i64,
    pub accuracy_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub total_questions: i64,
    pub total_correct: i64,
    pub accuracy_pct: f64,
    pub daily_breakdown: Vec<DailyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeEntry {
    pub student_id: i64,
    pub name: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyEntry {
    pub student_id: i64,
    pub name: String,
    pub total_questions: i64,
    pub accuracy_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberEntry {
    pub student_id: i64,
    pub name: String,
    pub qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamScorecard {
    pub team: String,
    pub total_questions: i64,
    pub total_correct: i64,
    pub accuracy_pct: f64,
    pub members: Vec<MemberEntry>,
}

/// Per-student grouping, keeping the name seen on the records.
struct StudentTally {
    student_id: i64,
    name: String,
    tally: Tally,
}

fn group_by_student<'a>(
    logs: impl IntoIterator<Item = &'a LogRecord>,
    window: &TimeWindow,
) -> Vec<StudentTally> {
    let mut groups: HashMap<i64, StudentTally> = HashMap::new();
    for log in logs.into_iter().filter(|l| window.contains(l.logged_at)) {
        groups
            .entry(log.student_id)
            .or_insert_with(|| StudentTally {
                student_id: log.student_id,
                name: log.student_name.clone(),
                tally: Tally::default(),
            })
            .tally
            .add(log);
    }
    groups.into_values().collect()
}

/// Volume descending, then name, then id.
fn by_volume(a: &StudentTally, b: &StudentTally) -> Ordering {
    b.tally
        .questions
        .cmp(&a.tally.questions)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.student_id.cmp(&b.student_id))
}

/// Totals and per-day series for one student inside `window`.
pub fn student_summary(logs: &[LogRecord], student_id: i64, window: &TimeWindow) -> StudentSummary {
    let mut total = Tally::default();
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();

    for log in logs
        .iter()
        .filter(|l| l.student_id == student_id && window.contains(l.logged_at))
    {
        total.add(log);
        days.entry(local_date(log.logged_at)).or_default().add(log);
    }

    StudentSummary {
        total_questions: total.questions,
        total_correct: total.correct,
        accuracy_pct: total.accuracy_pct(),
        daily_breakdown: days
            .into_iter()
            .map(|(date, tally)| DailyEntry {
                date,
                questions: tally.questions,
                correct: tally.correct,
                accuracy_pct: tally.accuracy_pct(),
            })
            .collect(),
    }
}

/// Students ordered by total questions; `None` means no cap.
pub fn leaderboard_by_volume(
    logs: &[LogRecord],
    window: &TimeWindow,
    limit: Option<usize>,
) -> Vec<VolumeEntry> {
    let mut groups = group_by_student(logs, window);
    groups.sort_by(by_volume);

    groups
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|g| VolumeEntry {
            student_id: g.student_id,
            name: g.name,
            total: g.tally.questions,
        })
        .collect()
}

/// Students with strictly more than `min_volume` questions, ordered by accuracy.
pub fn leaderboard_by_accuracy(
    logs: &[LogRecord],
    window: &TimeWindow,
    min_volume: i64,
    limit: Option<usize>,
) -> Vec<AccuracyEntry> {
    let mut groups: Vec<StudentTally> = group_by_student(logs, window)
        .into_iter()
        .filter(|g| g.tally.questions > min_volume)
        .collect();

    groups.sort_by(|a, b| {
        b.tally
            .cmp_accuracy(&a.tally)
            .then_with(|| by_volume(a, b))
    });

    groups
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|g| AccuracyEntry {
            student_id: g.student_id,
            name: g.name,
            total_questions: g.tally.questions,
            accuracy_pct: g.tally.accuracy_pct(),
        })
        .collect()
}

/// Totals for everyone currently on `team`, plus the members ranked by volume.
pub fn team_scorecard(logs: &[LogRecord], team: &str, window: &TimeWindow) -> TeamScorecard {
    let members: Vec<&LogRecord> = logs.iter().filter(|l| l.team == team).collect();

    let mut groups = group_by_student(members, window);
    groups.sort_by(by_volume);

    let total = groups.iter().fold(Tally::default(), |mut acc, g| {
        acc.questions += g.tally.questions;
        acc.correct += g.tally.correct;
        acc
    });

    TeamScorecard {
        team: team.to_string(),
        total_questions: total.questions,
        total_correct: total.correct,
        accuracy_pct: total.accuracy_pct(),
        members: groups
            .into_iter()
            .map(|g| MemberEntry {
                student_id: g.student_id,
                name: g.name,
                qty: g.tally.questions,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn log(
        student_id: i64,
        name: &str,
        team: &str,
        count: i64,
        correct: i64,
        when: DateTime<Utc>,
    ) -> LogRecord {
        LogRecord {
            student_id,
            student_name: name.to_string(),
            team: team.to_string(),
            question_count: count,
            correct_count: correct,
            logged_at: when,
        }
    }

    fn week() -> TimeWindow {
        TimeWindow {
            from: at(12, 3),
            to: at(19, 3) - Duration::seconds(1),
        }
    }

    #[test]
    fn summary_totals_and_accuracy() {
        let logs = vec![
            log(1, "Ana", "Alpha", 20, 15, at(13, 12)),
            log(1, "Ana", "Alpha", 10, 10, at(14, 12)),
            log(2, "Bia", "Alpha", 50, 1, at(14, 12)),
        ];

        let summary = student_summary(&logs, 1, &week());
        assert_eq!(summary.total_questions, 30);
        assert_eq!(summary.total_correct, 25);
        assert_eq!(summary.accuracy_pct, 83.33);
        assert_eq!(summary.daily_breakdown.len(), 2);
    }

    #[test]
    fn summary_daily_breakdown_uses_local_dates_in_order() {
        let logs = vec![
            // 01:00 UTC on the 15th is still the 14th locally.
            log(1, "Ana", "Alpha", 4, 2, at(15, 1)),
            log(1, "Ana", "Alpha", 6, 3, at(14, 12)),
            log(1, "Ana", "Alpha", 10, 9, at(13, 12)),
        ];

        let summary = student_summary(&logs, 1, &week());
        let dates: Vec<String> = summary
            .daily_breakdown
            .iter()
            .map(|d| d.date.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-05-13", "2024-05-14"]);
        assert_eq!(summary.daily_breakdown[1].questions, 10);
        assert_eq!(summary.daily_breakdown[1].accuracy_pct, 50.0);
    }

    #[test]
    fn empty_window_yields_zeroes() {
        let logs = vec![log(1, "Ana", "Alpha", 20, 15, at(1, 12))];
        let summary = student_summary(&logs, 1, &week());
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.accuracy_pct, 0.0);
        assert!(summary.daily_breakdown.is_empty());
    }

    #[test]
    fn accuracy_is_bounded() {
        assert_eq!(accuracy_pct(0, 0), 0.0);
        assert_eq!(accuracy_pct(5, 0), 0.0);
        assert_eq!(accuracy_pct(10, 10), 100.0);
        assert_eq!(accuracy_pct(1, 3), 33.33);
        assert_eq!(accuracy_pct(2, 3), 66.67);
    }

    #[test]
    fn volume_board_orders_and_caps() {
        let logs = vec![
            log(1, "Caio", "Alpha", 30, 10, at(13, 12)),
            log(2, "Ana", "Omega", 30, 20, at(13, 12)),
            log(3, "Bia", "Alpha", 50, 20, at(13, 12)),
            log(4, "Duda", "Alpha", 5, 5, at(13, 12)),
        ];

        let board = leaderboard_by_volume(&logs, &week(), Some(3));
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bia", "Ana", "Caio"]);
        assert_eq!(board[0].total, 50);
    }

    #[test]
    fn accuracy_board_excludes_students_at_or_below_threshold() {
        let logs = vec![
            log(1, "Lucky", "Alpha", 20, 20, at(13, 12)),
            log(2, "Steady", "Alpha", 21, 18, at(13, 12)),
            log(3, "Grinder", "Omega", 100, 70, at(13, 12)),
        ];

        let board = leaderboard_by_accuracy(&logs, &week(), 20, None);
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Steady", "Grinder"]);
        assert!(board.iter().all(|e| e.total_questions > 20));
        assert_eq!(board[0].accuracy_pct, 85.71);
    }

    #[test]
    fn accuracy_ties_prefer_higher_volume() {
        let logs = vec![
            log(1, "Small", "Alpha", 30, 15, at(13, 12)),
            log(2, "Large", "Alpha", 60, 30, at(13, 12)),
        ];

        let board = leaderboard_by_accuracy(&logs, &week(), 0, None);
        assert_eq!(board[0].name, "Large");
        assert_eq!(board[1].name, "Small");
    }

    #[test]
    fn team_scorecard_only_counts_members_in_window() {
        let logs = vec![
            log(1, "Ana", "Alpha", 50, 40, at(13, 12)),
            log(2, "Bia", "Alpha", 30, 15, at(14, 12)),
            log(2, "Bia", "Alpha", 99, 99, at(1, 12)),
            log(3, "Caio", "Omega", 70, 70, at(14, 12)),
        ];

        let card = team_scorecard(&logs, "Alpha", &week());
        assert_eq!(card.total_questions, 80);
        assert_eq!(card.total_correct, 55);
        assert_eq!(card.accuracy_pct, 68.75);
        assert_eq!(
            card.members,
            vec![
                MemberEntry { student_id: 1, name: "Ana".into(), qty: 50 },
                MemberEntry { student_id: 2, name: "Bia".into(), qty: 30 },
            ]
        );
    }

    #[test]
    fn team_without_logs_is_empty() {
        let card = team_scorecard(&[], "Omega", &week());
        assert_eq!(card.total_questions, 0);
        assert_eq!(card.accuracy_pct, 0.0);
        assert!(card.members.is_empty());
    }
}
