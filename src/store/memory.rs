// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ExamStore, InsertOutcome, StoreError};
use crate::engine::{
    Attempt, AttemptStatus, Completion, Exam, ExamSchedule, NewAttempt, Question, QuestionId,
};

#[derive(Default)]
struct Inner {
    exams: HashMap<i64, Exam>,
    schedules: HashMap<i64, ExamSchedule>,
    questions: BTreeMap<QuestionId, Question>,
    attempts: BTreeMap<i64, Attempt>,
    next_attempt_id: i64,
}

/// Process-local store. Every operation runs under one lock, which gives
/// the same exactly-once guarantees the Postgres store gets from its
/// unique constraint and conditional updates.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_exam(&self, exam: Exam) {
        self.inner.write().await.exams.insert(exam.id, exam);
    }

    pub async fn insert_schedule(&self, schedule: ExamSchedule) {
        self.inner.write().await.schedules.insert(schedule.id, schedule);
    }

    pub async fn insert_question(&self, question: Question) {
        self.inner.write().await.questions.insert(question.id, question);
    }

    /// Edits a bank question in place. Returns `false` if it does not exist.
    pub async fn update_question<F>(&self, question_id: QuestionId, edit: F) -> bool
    where
        F: FnOnce(&mut Question),
    {
        match self.inner.write().await.questions.get_mut(&question_id) {
            Some(question) => {
                edit(question);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        Ok(self.inner.read().await.exams.get(&exam_id).cloned())
    }

    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<ExamSchedule>, StoreError> {
        Ok(self.inner.read().await.schedules.get(&schedule_id).cloned())
    }

    async fn get_questions_for_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn find_attempt(&self, student_id: i64, schedule_id: i64) -> Result<Option<Attempt>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .attempts
            .values()
            .find(|a| a.student_id == student_id && a.schedule_id == schedule_id)
            .cloned())
    }

    async fn find_attempt_by_id(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        Ok(self.inner.read().await.attempts.get(&attempt_id).cloned())
    }

    async fn list_attempts_for_schedule(&self, schedule_id: i64) -> Result<Vec<Attempt>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .attempts
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .attempts
            .values()
            .find(|a| a.student_id == attempt.student_id && a.schedule_id == attempt.schedule_id)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        inner.next_attempt_id += 1;
        let id = inner.next_attempt_id;
        let created = Attempt::from_new(id, attempt);
        inner.attempts.insert(id, created.clone());
        Ok(InsertOutcome::Created(created))
    }

    async fn save_answers(&self, attempt_id: i64, answers: &HashMap<QuestionId, String>) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get_mut(&attempt_id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.answers = answers.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finalize_attempt(&self, attempt_id: i64, completion: &Completion) -> Result<Option<Attempt>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get_mut(&attempt_id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.apply(completion);
                Ok(Some(attempt.clone()))
            }
            _ => Ok(None),
        }
    }
}
