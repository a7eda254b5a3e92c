// src/engine/scoring.rs

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{AssignedQuestion, EngineError, QuestionId, QuestionType};

/// Longest answer accepted for a single question.
pub const MAX_ANSWER_LENGTH: usize = 2000;

impl QuestionType {
    /// Per-type equality between a submitted answer and the answer key.
    ///
    /// * `MultipleChoice`: exact, case-sensitive match on the option text.
    /// * `TrueFalse`: both sides must be the token `true` or `false`, compared
    ///   case-insensitively.
    /// * `FillBlank`: trimmed, case-insensitive exact match.
    ///
    /// A blank answer key matches nothing, and neither does a blank submission.
    pub fn is_correct(self, submitted: &str, expected: &str) -> bool {
        if submitted.trim().is_empty() || expected.trim().is_empty() {
            return false;
        }
        match self {
            QuestionType::MultipleChoice => submitted == expected,
            QuestionType::TrueFalse => match (bool_token(submitted), bool_token(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            QuestionType::FillBlank => submitted.trim().to_lowercase() == expected.trim().to_lowercase(),
        }
    }
}

fn bool_token(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Outcome for one assigned question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub submitted_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub marks: i32,
    pub marks_obtained: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSheet {
    pub score: i32,
    pub total_marks: i32,
    pub percentage: i32,
    pub questions: Vec<QuestionResult>,
}

impl ScoreSheet {
    pub fn passed(&self, passing_score: i32) -> bool {
        self.percentage >= passing_score
    }
}

/// `round(100 * score / total_marks)`, rounding halves up. Zero when there
/// are no marks to earn.
pub fn percentage(score: i32, total_marks: i32) -> i32 {
    if total_marks <= 0 {
        return 0;
    }
    let score = i64::from(score.max(0));
    let total = i64::from(total_marks);
    ((200 * score + total) / (2 * total)) as i32
}

/// Rejects answer maps that do not fit the attempt's snapshot.
pub fn validate_answers(
    assigned: &[AssignedQuestion],
    answers: &HashMap<QuestionId, String>,
) -> Result<(), EngineError> {
    let ids: HashSet<QuestionId> = assigned.iter().map(|q| q.id).collect();
    for (id, answer) in answers {
        if !ids.contains(id) {
            return Err(EngineError::InvalidAnswerShape(format!(
                "question {} is not part of this attempt",
                id
            )));
        }
        if answer.chars().count() > MAX_ANSWER_LENGTH {
            return Err(EngineError::InvalidAnswerShape(format!(
                "answer to question {} is longer than {} characters",
                id, MAX_ANSWER_LENGTH
            )));
        }
    }
    Ok(())
}

/// Marks every assigned question against its frozen answer key.
///
/// A missing or blank answer counts as unanswered. Only the snapshot is consulted, so
/// later edits to the question bank cannot change the outcome.
pub fn score_answers(assigned: &[AssignedQuestion], answers: &HashMap<QuestionId, String>) -> ScoreSheet {
    let mut score: i32 = 0;
    let mut total_marks: i32 = 0;
    let mut questions = Vec::with_capacity(assigned.len());

    for q in assigned {
        let submitted = answers.get(&q.id).filter(|ans| !ans.trim().is_empty());
        let is_correct = submitted.is_some_and(|ans| q.question_type.is_correct(ans, &q.correct_answer));
        let marks_obtained = if is_correct { q.marks } else { 0 };

        total_marks = total_marks.saturating_add(q.marks);
        score = score.saturating_add(marks_obtained);
        questions.push(QuestionResult {
            question_id: q.id,
            question_type: q.question_type,
            submitted_answer: submitted.cloned(),
            correct_answer: q.correct_answer.clone(),
            is_correct,
            marks: q.marks,
            marks_obtained,
        });
    }

    ScoreSheet {
        score,
        total_marks,
        percentage: percentage(score, total_marks),
        questions,
    }
}
