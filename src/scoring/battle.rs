//! Two-team weekly battle.

use serde::Serialize;

use super::{
    aggregate::{LogRecord, TeamScorecard, team_scorecard},
    week::{Period, TimeWindow},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "team", rename_all = "snake_case")]
pub enum BattleOutcome {
    Winner(String),
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamBattle {
    pub team_a: TeamScorecard,
    pub team_b: TeamScorecard,
    pub outcome: BattleOutcome,
    pub period: Period,
}

/// Higher total volume wins; equal volume is a tie regardless of accuracy.
pub fn decide(team_a: &TeamScorecard, team_b: &TeamScorecard) -> BattleOutcome {
    if team_a.total_questions > team_b.total_questions {
        BattleOutcome::Winner(team_a.team.clone())
    } else if team_b.total_questions > team_a.total_questions {
        BattleOutcome::Winner(team_b.team.clone())
    } else {
        BattleOutcome::Tie
    }
}

pub fn resolve_battle(
    logs: &[LogRecord],
    team_a: &str,
    team_b: &str,
    window: &TimeWindow,
) -> TeamBattle {
    let a = team_scorecard(logs, team_a, window);
    let b = team_scorecard(logs, team_b, window);
    let outcome = decide(&a, &b);

    TeamBattle {
        team_a: a,
        team_b: b,
        outcome,
        period: window.period(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::week::current_week;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn log(student_id: i64, team: &str, count: i64, correct: i64) -> LogRecord {
        LogRecord {
            student_id,
            student_name: format!("student-{student_id}"),
            team: team.to_string(),
            question_count: count,
            correct_count: correct,
            logged_at: now(),
        }
    }

    #[test]
    fn higher_volume_wins() {
        let logs = vec![log(1, "Alpha", 50, 10), log(2, "Alpha", 30, 10)];
        let battle = resolve_battle(&logs, "Alpha", "Omega", &current_week(now()));

        assert_eq!(battle.team_a.total_questions, 80);
        assert_eq!(battle.team_b.total_questions, 0);
        assert_eq!(battle.outcome, BattleOutcome::Winner("Alpha".into()));
        assert_eq!(battle.period.start, "12/05/2024");
        assert_eq!(battle.period.end, "18/05/2024");
    }

    #[test]
    fn team_b_can_win() {
        let logs = vec![log(1, "Alpha", 10, 10), log(2, "Omega", 11, 0)];
        let battle = resolve_battle(&logs, "Alpha", "Omega", &current_week(now()));
        assert_eq!(battle.outcome, BattleOutcome::Winner("Omega".into()));
    }

    #[test]
    fn equal_volume_is_a_tie_even_with_better_accuracy() {
        let logs = vec![log(1, "Alpha", 40, 40), log(2, "Omega", 40, 1)];
        let battle = resolve_battle(&logs, "Alpha", "Omega", &current_week(now()));
        assert_eq!(battle.outcome, BattleOutcome::Tie);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let winner = serde_json::to_value(BattleOutcome::Winner("Alpha".into())).unwrap();
        assert_eq!(winner, serde_json::json!({"result": "winner", "team": "Alpha"}));

        let tie = serde_json::to_value(BattleOutcome::Tie).unwrap();
        assert_eq!(tie, serde_json::json!({"result": "tie"}));
    }
}
