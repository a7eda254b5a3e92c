// src/services/attempt.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    engine::{
        Attempt, AttemptStatus, EngineError, NewAttempt, QuestionId, RandomSource, assign_questions,
        score_answers, validate_answers,
    },
    error::AppError,
    models::attempt::{ScheduleReport, ScoreResult},
    store::{ExamStore, InsertOutcome},
};

/// Drives an attempt through its lifecycle against a store.
///
/// Expiry is evaluated lazily: every entry point that loads an in-progress
/// attempt first checks its deadline and, if it has passed, finalizes it with
/// the answers recorded so far.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn ExamStore>,
    random: Arc<dyn RandomSource>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn ExamStore>, random: Arc<dyn RandomSource>) -> Self {
        Self { store, random }
    }

    /// Access verification for a scheduled exam.
    ///
    /// Returns the student's existing attempt if there is one (the stored
    /// snapshot, never a resample). Otherwise checks the schedule window,
    /// samples the question pool and persists a new attempt.
    pub async fn start_attempt(
        &self,
        student_id: i64,
        schedule_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError> {
        let schedule = self
            .store
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schedule {} not found", schedule_id)))?;

        if let Some(existing) = self.store.find_attempt(student_id, schedule_id).await? {
            tracing::debug!("Resuming: {}", EngineError::AlreadyStarted { attempt_id: existing.id });
            return self.settle(existing, now).await;
        }

        if now < schedule.starts_at {
            return Err(EngineError::ScheduleNotOpen { schedule_id }.into());
        }
        if now >= schedule.ends_at {
            return Err(EngineError::ScheduleClosed { schedule_id }.into());
        }

        let exam = self
            .store
            .get_exam(schedule.exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", schedule.exam_id)))?;
        let pool = self.store.get_questions_for_exam(exam.id).await?;

        let assigned = {
            let mut rng = self.random.rng();
            assign_questions(&exam, &pool, &mut rng).inspect_err(|e| {
                tracing::warn!("Cannot start exam {} for student {}: {}", exam.id, student_id, e);
            })?
        };

        let new_attempt = NewAttempt::begin(student_id, &exam, &schedule, assigned, now);
        match self.store.insert_attempt(new_attempt).await? {
            InsertOutcome::Created(attempt) => {
                tracing::info!(
                    "Attempt {} created: student {} schedule {} ({} of {} questions, {} marks)",
                    attempt.id,
                    student_id,
                    schedule_id,
                    attempt.assigned_questions.len(),
                    pool.len(),
                    attempt.total_marks
                );
                Ok(attempt)
            }
            InsertOutcome::Existing(attempt) => {
                tracing::info!(
                    "Attempt {} was created concurrently; discarding this sample",
                    attempt.id
                );
                self.settle(attempt, now).await
            }
        }
    }

    /// Records in-progress answers. These are what an expired attempt is
    /// scored with.
    pub async fn save_answers(
        &self,
        attempt_id: i64,
        student_id: i64,
        answers: HashMap<QuestionId, String>,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError> {
        let attempt = self.load_owned(attempt_id, student_id).await?;
        if attempt.status.is_terminal() {
            return Err(EngineError::AlreadySubmitted { attempt_id }.into());
        }
        if attempt.lapsed_status(now).is_some() {
            self.settle(attempt, now).await?;
            return Err(EngineError::AttemptExpired { attempt_id }.into());
        }

        validate_answers(&attempt.assigned_questions, &answers)?;

        if !self.store.save_answers(attempt_id, &answers).await? {
            return Err(EngineError::AlreadySubmitted { attempt_id }.into());
        }
        tracing::debug!("Attempt {}: recorded {} answers", attempt_id, answers.len());

        Ok(Attempt { answers, ..attempt })
    }

    /// Scores a submission exactly once.
    ///
    /// A submission that arrives after the deadline is not rejected: the
    /// attempt is finalized with its recorded answers under the lapsed status
    /// and the late payload is discarded.
    pub async fn submit_answers(
        &self,
        attempt_id: i64,
        student_id: i64,
        answers: HashMap<QuestionId, String>,
        now: DateTime<Utc>,
    ) -> Result<ScoreResult, AppError> {
        let attempt = self.load_owned(attempt_id, student_id).await?;
        if attempt.status.is_terminal() {
            tracing::warn!("Attempt {}: rejected repeated submission", attempt_id);
            return Err(EngineError::AlreadySubmitted { attempt_id }.into());
        }

        if let Some(status) = attempt.lapsed_status(now) {
            tracing::warn!(
                "Attempt {}: submission after deadline, scoring recorded answers as {}",
                attempt_id,
                status
            );
            let recorded = attempt.answers.clone();
            let done = self.finalize(&attempt, recorded, status, now).await?;
            return Ok(ScoreResult::from(&done));
        }

        validate_answers(&attempt.assigned_questions, &answers)?;

        let done = self.finalize(&attempt, answers, AttemptStatus::Completed, now).await?;
        tracing::info!(
            "Attempt {} scored: {}/{} ({}%)",
            done.id,
            done.score.unwrap_or(0),
            done.total_marks,
            done.percentage.unwrap_or(0)
        );
        Ok(ScoreResult::from(&done))
    }

    /// The student's result. Only terminal attempts have one.
    pub async fn get_result(
        &self,
        attempt_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ScoreResult, AppError> {
        let attempt = self.load_owned(attempt_id, student_id).await?;
        let attempt = self.settle(attempt, now).await?;
        if !attempt.status.is_terminal() {
            return Err(EngineError::AttemptInProgress { attempt_id }.into());
        }
        Ok(ScoreResult::from(&attempt))
    }

    /// Every scored attempt of a schedule, for tutors and schools.
    ///
    /// Overdue attempts are finalized first; attempts still running are only
    /// counted, never reported without a score.
    pub async fn schedule_results(&self, schedule_id: i64, now: DateTime<Utc>) -> Result<ScheduleReport, AppError> {
        if self.store.get_schedule(schedule_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Schedule {} not found", schedule_id)));
        }

        let mut results = Vec::new();
        let mut in_progress = 0;
        for attempt in self.store.list_attempts_for_schedule(schedule_id).await? {
            let attempt = self.settle(attempt, now).await?;
            if attempt.status.is_terminal() {
                results.push(ScoreResult::from(&attempt));
            } else {
                in_progress += 1;
            }
        }

        Ok(ScheduleReport {
            schedule_id,
            in_progress,
            results,
        })
    }

    async fn load_owned(&self, attempt_id: i64, student_id: i64) -> Result<Attempt, AppError> {
        match self.store.find_attempt_by_id(attempt_id).await? {
            Some(attempt) if attempt.student_id == student_id => Ok(attempt),
            _ => Err(AppError::NotFound(format!("Attempt {} not found", attempt_id))),
        }
    }

    /// Finalizes an overdue attempt; returns any other attempt unchanged.
    async fn settle(&self, attempt: Attempt, now: DateTime<Utc>) -> Result<Attempt, AppError> {
        let Some(status) = attempt.lapsed_status(now) else {
            return Ok(attempt);
        };

        tracing::info!("Attempt {} lapsed as {}, auto-submitting", attempt.id, status);
        let recorded = attempt.answers.clone();
        match self.finalize(&attempt, recorded, status, now).await {
            Err(AppError::Exam(EngineError::AlreadySubmitted { .. })) => self.reload(attempt.id).await,
            other => other,
        }
    }

    /// The one terminal write. Loses cleanly to a concurrent finalize.
    async fn finalize(
        &self,
        attempt: &Attempt,
        answers: HashMap<QuestionId, String>,
        status: AttemptStatus,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError> {
        let sheet = score_answers(&attempt.assigned_questions, &answers);
        let completion = attempt.complete(status, answers, &sheet, now)?;

        self.store
            .finalize_attempt(attempt.id, &completion)
            .await?
            .ok_or_else(|| EngineError::AlreadySubmitted { attempt_id: attempt.id }.into())
    }

    async fn reload(&self, attempt_id: i64) -> Result<Attempt, AppError> {
        self.store
            .find_attempt_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))
    }
}
