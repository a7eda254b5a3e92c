// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    engine::{Attempt, AttemptStatus, QuestionResult, score_answers},
    models::question::PresentedQuestion,
};

/// Upper bound on answers in one payload.
pub const MAX_ANSWERS_PER_SUBMISSION: usize = 500;

/// DTO returned by access verification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub schedule_id: i64,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    /// When the attempt stops accepting answers.
    pub deadline_at: DateTime<Utc>,
    pub total_marks: i32,
    pub questions: Vec<PresentedQuestion>,
    /// Answers recorded so far, so a resumed session can restore its state.
    pub answers: HashMap<i64, String>,
}

impl From<&Attempt> for StartAttemptResponse {
    fn from(attempt: &Attempt) -> Self {
        Self {
            attempt_id: attempt.id,
            exam_id: attempt.exam_id,
            schedule_id: attempt.schedule_id,
            status: attempt.status,
            started_at: attempt.started_at,
            deadline_at: attempt.deadline(),
            total_marks: attempt.total_marks,
            questions: attempt.assigned_questions.iter().map(PresentedQuestion::from).collect(),
            answers: attempt.answers.clone(),
        }
    }
}

/// DTO for saving progress or submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: User's answer (option text, true/false token or free text)
    #[validate(custom(function = validate_answer_count))]
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

fn validate_answer_count(answers: &HashMap<i64, String>) -> Result<(), validator::ValidationError> {
    if answers.len() > MAX_ANSWERS_PER_SUBMISSION {
        return Err(validator::ValidationError::new("too_many_answers"));
    }
    Ok(())
}

/// Scored outcome of a terminal attempt, as consumed by results and
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub attempt_id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub schedule_id: i64,
    pub status: AttemptStatus,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: i32,
    pub passed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionResult>,
}

impl From<&Attempt> for ScoreResult {
    fn from(attempt: &Attempt) -> Self {
        let sheet = score_answers(&attempt.assigned_questions, &attempt.answers);
        Self {
            attempt_id: attempt.id,
            student_id: attempt.student_id,
            exam_id: attempt.exam_id,
            schedule_id: attempt.schedule_id,
            status: attempt.status,
            score: attempt.score.unwrap_or(sheet.score),
            total_marks: attempt.total_marks,
            percentage: attempt.percentage.unwrap_or(sheet.percentage),
            passed: attempt.passed.unwrap_or(false),
            completed_at: attempt.completed_at,
            questions: sheet.questions,
        }
    }
}

/// Aggregated view of one schedule for tutors and schools.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReport {
    pub schedule_id: i64,
    /// Attempts still running; they have no score yet and are not listed.
    pub in_progress: usize,
    pub results: Vec<ScoreResult>,
}
