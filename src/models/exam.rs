// src/models/exam.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::html::validate_plain_text;

/// Represents the 'exam_providers' table: organizers of mock exams.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamProvider {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProviderRequest {
    #[validate(
        length(min = 1, max = 100, message = "Provider name must be between 1 and 100 characters."),
        custom(function = validate_plain_text)
    )]
    pub name: String,
}

/// Represents the 'mock_exams' table joined with its provider's name.
/// Exactly one of `number` and `label` is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockExam {
    pub id: i64,
    pub provider_id: i64,
    pub provider_name: String,
    pub number: Option<i64>,
    pub label: Option<String>,
    pub category: String,
    pub held_on: NaiveDate,
}

impl MockExam {
    /// "<provider> - Nº <number> (<category>)" or "<provider> - <label> (<category>)".
    pub fn display_name(&self) -> String {
        display_name(
            &self.provider_name,
            self.number,
            self.label.as_deref(),
            &self.category,
        )
    }
}

pub fn display_name(
    provider: &str,
    number: Option<i64>,
    label: Option<&str>,
    category: &str,
) -> String {
    let title = match (number, label) {
        (Some(n), _) => format!("Nº {n}"),
        (None, Some(label)) => label.to_string(),
        (None, None) => String::new(),
    };
    format!("{provider} - {title} ({category})")
}

#[derive(Debug, Serialize)]
pub struct MockExamListItem {
    pub id: i64,
    pub display_name: String,
    /// `dd/mm/YYYY`
    pub date: String,
    pub held_on: NaiveDate,
}

impl From<MockExam> for MockExamListItem {
    fn from(exam: MockExam) -> Self {
        Self {
            id: exam.id,
            display_name: exam.display_name(),
            date: exam.held_on.format("%d/%m/%Y").to_string(),
            held_on: exam.held_on,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_number_or_label))]
pub struct CreateMockExamRequest {
    #[validate(required(message = "provider_id is required"))]
    pub provider_id: Option<i64>,

    #[validate(range(min = 1, message = "number must be positive"))]
    pub number: Option<i64>,

    #[validate(
        length(min = 1, max = 100, message = "Label must be between 1 and 100 characters."),
        custom(function = validate_plain_text)
    )]
    pub label: Option<String>,

    #[validate(
        required(message = "category is required"),
        length(min = 1, max = 50, message = "Category must be between 1 and 50 characters."),
        custom(function = validate_plain_text)
    )]
    pub category: Option<String>,

    /// `YYYY-MM-DD`
    #[validate(required(message = "held_on is required"))]
    pub held_on: Option<NaiveDate>,
}

fn validate_number_or_label(req: &CreateMockExamRequest) -> Result<(), validator::ValidationError> {
    let has_label = req.label.as_deref().is_some_and(|l| !l.trim().is_empty());
    if req.number.is_some() == has_label {
        let mut err = validator::ValidationError::new("number_or_label");
        err.message = Some("Provide either a number or a label, not both.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamResultRequest {
    #[validate(required(message = "student_id is required"))]
    pub student_id: Option<i64>,

    #[validate(required(message = "exam_id is required"))]
    pub exam_id: Option<i64>,

    #[validate(
        required(message = "score is required"),
        range(min = 0.0, message = "score must not be negative")
    )]
    pub score: Option<f64>,
}

/// One line of a mock exam's ranking.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamRankingEntry {
    pub student_id: i64,
    pub student_name: String,
    pub score: f64,
}

/// Row of the "recent results" feed.
#[derive(Debug, Serialize)]
pub struct RecentResultEntry {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub exam_name: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_request(number: Option<i64>, label: Option<&str>) -> CreateMockExamRequest {
        CreateMockExamRequest {
            provider_id: Some(1),
            number,
            label: label.map(str::to_string),
            category: Some("Geral".into()),
            held_on: NaiveDate::from_ymd_opt(2024, 5, 12),
        }
    }

    #[test]
    fn exactly_one_identifier_is_required() {
        assert!(exam_request(Some(3), None).validate().is_ok());
        assert!(exam_request(None, Some("Final")).validate().is_ok());
        assert!(exam_request(None, None).validate().is_err());
        assert!(exam_request(Some(3), Some("Final")).validate().is_err());
    }

    #[test]
    fn display_name_prefers_number() {
        assert_eq!(display_name("Quad", Some(4), None, "PM"), "Quad - Nº 4 (PM)");
        assert_eq!(
            display_name("rumo", None, Some("Reta final"), "PC"),
            "rumo - Reta final (PC)"
        );
    }

    #[test]
    fn missing_score_is_a_validation_error() {
        let req = CreateExamResultRequest {
            student_id: Some(1),
            exam_id: Some(1),
            score: None,
        };
        assert!(req.validate().is_err());
    }
}
