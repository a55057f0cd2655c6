// src/models/practice_log.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for recording a practice session.
/// Absent fields are reported as validation errors rather than JSON rejections.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_correct_within_count))]
pub struct CreatePracticeLogRequest {
    #[validate(required(message = "student_id is required"))]
    pub student_id: Option<i64>,

    #[validate(
        required(message = "question_count is required"),
        range(min = 1, message = "question_count must be positive")
    )]
    pub question_count: Option<i64>,

    #[validate(
        required(message = "correct_count is required"),
        range(min = 0, message = "correct_count must not be negative")
    )]
    pub correct_count: Option<i64>,
}

fn validate_correct_within_count(
    req: &CreatePracticeLogRequest,
) -> Result<(), validator::ValidationError> {
    if let (Some(count), Some(correct)) = (req.question_count, req.correct_count) {
        if correct > count {
            let mut err = validator::ValidationError::new("correct_exceeds_count");
            err.message = Some("correct_count cannot exceed question_count".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Row of the "recent logs" feed.
#[derive(Debug, Serialize)]
pub struct RecentLogEntry {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub question_count: i64,
    pub correct_count: i64,
    pub logged_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: Option<i64>, correct: Option<i64>) -> CreatePracticeLogRequest {
        CreatePracticeLogRequest {
            student_id: Some(1),
            question_count: count,
            correct_count: correct,
        }
    }

    #[test]
    fn accepts_correct_up_to_count() {
        assert!(request(Some(10), Some(10)).validate().is_ok());
        assert!(request(Some(10), Some(0)).validate().is_ok());
    }

    #[test]
    fn rejects_correct_above_count() {
        assert!(request(Some(10), Some(11)).validate().is_err());
    }

    #[test]
    fn rejects_missing_or_non_positive_count() {
        assert!(request(None, Some(1)).validate().is_err());
        assert!(request(Some(0), Some(0)).validate().is_err());
        assert!(request(Some(5), Some(-1)).validate().is_err());
    }
}
