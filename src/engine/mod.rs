// src/engine/mod.rs

//! Exam assignment and scoring core.
//!
//! Everything in here is synchronous and free of I/O: the store and the
//! HTTP layer hand it question pools and attempts, and it hands back
//! snapshots, score sheets and state transitions.

pub mod attempt;
pub mod error;
pub mod question;
pub mod sampler;
pub mod scoring;
pub mod stratify;

pub use attempt::{Attempt, AttemptStatus, Completion, NewAttempt};
pub use error::EngineError;
pub use question::{
    DifficultyBucket, Exam, ExamSchedule, MAX_QUESTION_MARKS, Question, QuestionId, QuestionOption, QuestionType,
};
pub use sampler::{AssignedQuestion, EntropySource, RandomSource, SeededSource, assign_questions};
pub use scoring::{QuestionResult, ScoreSheet, percentage, score_answers, validate_answers};
pub use stratify::compute_bucket_sizes;
