// src/engine/question.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EngineError;

pub type QuestionId = i64;

/// Closed set of question kinds. Each variant carries its own answer
/// equality rule (see `scoring`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            "fill_blank" => Ok(QuestionType::FillBlank),
            other => Err(EngineError::UnknownQuestionType(other.to_string())),
        }
    }
}

/// Stratification signal for a question.
///
/// Declaration order is the presentation order used when question
/// shuffling is off: hard, then medium, then easy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBucket {
    Hard,
    Medium,
    Easy,
}

impl DifficultyBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyBucket::Hard => "hard",
            DifficultyBucket::Medium => "medium",
            DifficultyBucket::Easy => "easy",
        }
    }
}

impl fmt::Display for DifficultyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyBucket {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard" => Ok(DifficultyBucket::Hard),
            "medium" => Ok(DifficultyBucket::Medium),
            "easy" => Ok(DifficultyBucket::Easy),
            other => Err(EngineError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Largest mark a single question may carry.
pub const MAX_QUESTION_MARKS: i32 = 1000;

/// A question as authored in the bank. Owned by an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub exam_id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Option<Vec<QuestionOption>>,
    pub correct_answer: String,
    pub marks: i32,
    pub difficulty: DifficultyBucket,
}

impl Question {
    /// The answer a submission is compared against.
    ///
    /// Multiple-choice questions authored with a flagged option but a blank
    /// `correct_answer` fall back to the flagged option's text.
    pub fn answer_key(&self) -> String {
        if self.question_type == QuestionType::MultipleChoice && self.correct_answer.trim().is_empty() {
            if let Some(option) = self
                .options
                .as_deref()
                .and_then(|options| options.iter().find(|o| o.is_correct))
            {
                return option.text.clone();
            }
        }
        self.correct_answer.clone()
    }
}

/// Exam configuration relevant to assignment and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,
    /// Target sample size. Zero or less serves the whole pool.
    pub total_questions: i32,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    /// Pass mark as a percentage, 0..=100.
    pub passing_score: i32,
    /// Allotted time once started. `None` means only the schedule window applies.
    pub duration_minutes: Option<i32>,
}

/// The window during which an exam can be sat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSchedule {
    pub id: i64,
    pub exam_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ExamSchedule {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at && now < self.ends_at
    }
}
