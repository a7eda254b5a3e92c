// src/models/question.rs

use serde::Serialize;

use crate::engine::{AssignedQuestion, QuestionType};

/// DTO for sending an assigned question to the exam-taking client
/// (excludes the correct answer and the option flags).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedQuestion {
    pub id: i64,

    pub question_type: QuestionType,

    /// The text content of the question.
    pub text: String,

    /// Option texts in the order this student sees them.
    /// Absent for fill-in-the-blank questions.
    pub options: Option<Vec<String>>,

    pub marks: i32,
}

impl From<&AssignedQuestion> for PresentedQuestion {
    fn from(q: &AssignedQuestion) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            text: q.text.clone(),
            options: q
                .options
                .as_ref()
                .map(|options| options.iter().map(|o| o.text.clone()).collect()),
            marks: q.marks,
        }
    }
}
