// src/store/mod.rs

//! Storage seam for the exam core.
//!
//! The relational schema is owned elsewhere; the core only needs to read a
//! question pool and to create and finalize attempts with exactly-once
//! semantics per (student, schedule).

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::{Attempt, Completion, EngineError, Exam, ExamSchedule, NewAttempt, Question, QuestionId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<EngineError> for StoreError {
    fn from(err: EngineError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Result of inserting an attempt for a (student, schedule) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// This call created the attempt.
    Created(Attempt),
    /// Another call got there first; its attempt is returned untouched.
    Existing(Attempt),
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError>;

    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<ExamSchedule>, StoreError>;

    /// The full question pool of an exam, ordered by id.
    async fn get_questions_for_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError>;

    async fn find_attempt(&self, student_id: i64, schedule_id: i64) -> Result<Option<Attempt>, StoreError>;

    async fn find_attempt_by_id(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError>;

    async fn list_attempts_for_schedule(&self, schedule_id: i64) -> Result<Vec<Attempt>, StoreError>;

    /// Inserts unless the (student, schedule) pair already has an attempt.
    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<InsertOutcome, StoreError>;

    /// Replaces the recorded answers. Returns `false` when the attempt is no
    /// longer in progress.
    async fn save_answers(&self, attempt_id: i64, answers: &HashMap<QuestionId, String>) -> Result<bool, StoreError>;

    /// Applies `completion` only if the attempt is still in progress.
    /// Returns the finalized attempt, or `None` if another call finalized it first.
    async fn finalize_attempt(&self, attempt_id: i64, completion: &Completion) -> Result<Option<Attempt>, StoreError>;
}
