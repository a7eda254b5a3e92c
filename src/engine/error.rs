// src/engine/error.rs

use thiserror::Error;

use super::QuestionId;

/// Failures raised by sampling, scoring and attempt transitions.
///
/// Kept separate from the HTTP-facing `AppError` so callers can tell a fatal
/// condition apart from one that has already been handled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No questions are available to sample from.
    #[error("exam {exam_id} has no questions to assign")]
    EmptyQuestionPool { exam_id: i64 },

    /// A resample was requested on an attempt that already exists.
    /// The service recovers from this by returning the stored snapshot.
    #[error("attempt {attempt_id} has already started")]
    AlreadyStarted { attempt_id: i64 },

    /// The attempt has already reached a terminal state.
    #[error("attempt {attempt_id} has already been submitted")]
    AlreadySubmitted { attempt_id: i64 },

    /// The submission payload does not fit the attempt.
    #[error("invalid answer payload: {0}")]
    InvalidAnswerShape(String),

    /// The deadline passed before the call arrived; the attempt was auto-scored.
    #[error("attempt {attempt_id} expired and was scored with its recorded answers")]
    AttemptExpired { attempt_id: i64 },

    /// A result was requested for an attempt that is still running.
    #[error("attempt {attempt_id} is still in progress")]
    AttemptInProgress { attempt_id: i64 },

    #[error("schedule {schedule_id} has not opened yet")]
    ScheduleNotOpen { schedule_id: i64 },

    #[error("schedule {schedule_id} has already closed")]
    ScheduleClosed { schedule_id: i64 },

    #[error("unknown question type '{0}'")]
    UnknownQuestionType(String),

    #[error("unknown difficulty bucket '{0}'")]
    UnknownDifficulty(String),

    #[error("unknown attempt status '{0}'")]
    UnknownStatus(String),

    #[error("cannot move an attempt from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("question {0} appears more than once in the pool")]
    DuplicateQuestion(QuestionId),

    #[error("question {question_id} carries {marks} marks, outside 1..={max}", max = super::MAX_QUESTION_MARKS)]
    InvalidMarks { question_id: QuestionId, marks: i32 },
}
