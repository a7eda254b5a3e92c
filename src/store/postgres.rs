// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{ExamStore, InsertOutcome, StoreError};
use crate::engine::{
    AssignedQuestion, Attempt, Completion, Exam, ExamSchedule, NewAttempt, Question, QuestionId,
    QuestionOption,
};

const ATTEMPT_COLUMNS: &str = r#"
    id,
    student_id,
    exam_id,
    schedule_id,
    assigned_questions,
    answers,
    score,
    total_marks,
    percentage,
    passed,
    passing_score,
    status,
    started_at,
    duration_ends_at,
    window_ends_at,
    completed_at
"#;

/// Row of the `exams` table.
#[derive(FromRow)]
struct ExamRow {
    id: i64,
    title: String,
    total_questions: i32,
    shuffle_questions: bool,
    shuffle_options: bool,
    passing_score: i32,
    duration_minutes: Option<i32>,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        Exam {
            id: row.id,
            title: row.title,
            total_questions: row.total_questions,
            shuffle_questions: row.shuffle_questions,
            shuffle_options: row.shuffle_options,
            passing_score: row.passing_score,
            duration_minutes: row.duration_minutes,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRow {
    id: i64,
    exam_id: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

/// Row of the `questions` table. `question_type` and `difficulty` are TEXT
/// columns guarded by CHECK constraints.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    exam_id: i64,
    question_text: String,
    question_type: String,
    options: Option<Json<Vec<QuestionOption>>>,
    correct_answer: String,
    marks: i32,
    difficulty: String,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: row.id,
            exam_id: row.exam_id,
            text: row.question_text,
            question_type: row.question_type.parse()?,
            options: row.options.map(|o| o.0),
            correct_answer: row.correct_answer,
            marks: row.marks,
            difficulty: row.difficulty.parse()?,
        })
    }
}

/// Row of the `student_exams` table. The snapshot and the answers live in
/// JSONB columns so the attempt owns a value copy of every question.
#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    student_id: i64,
    exam_id: i64,
    schedule_id: i64,
    assigned_questions: Json<Vec<AssignedQuestion>>,
    answers: Json<HashMap<QuestionId, String>>,
    score: Option<i32>,
    total_marks: i32,
    percentage: Option<i32>,
    passed: Option<bool>,
    passing_score: i32,
    status: String,
    started_at: DateTime<Utc>,
    duration_ends_at: Option<DateTime<Utc>>,
    window_ends_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Attempt {
            id: row.id,
            student_id: row.student_id,
            exam_id: row.exam_id,
            schedule_id: row.schedule_id,
            assigned_questions: row.assigned_questions.0,
            answers: row.answers.0,
            score: row.score,
            total_marks: row.total_marks,
            percentage: row.percentage,
            passed: row.passed,
            passing_score: row.passing_score,
            status: row.status.parse()?,
            started_at: row.started_at,
            duration_ends_at: row.duration_ends_at,
            window_ends_at: row.window_ends_at,
            completed_at: row.completed_at,
        })
    }
}

/// Postgres-backed store.
///
/// Exactly-once creation relies on the `(student_id, schedule_id)` unique
/// constraint; exactly-once scoring relies on `WHERE status = 'in_progress'`
/// guarding the terminal update.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"
            SELECT id, title, total_questions, shuffle_questions, shuffle_options,
                   passing_score, duration_minutes
            FROM exams
            WHERE id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Exam::from))
    }

    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<ExamSchedule>, StoreError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, exam_id, starts_at, ends_at FROM exam_schedules WHERE id = $1",
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ExamSchedule {
            id: r.id,
            exam_id: r.exam_id,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
        }))
    }

    async fn get_questions_for_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, exam_id, question_text, question_type, options,
                   correct_answer, marks, difficulty
            FROM questions
            WHERE exam_id = $1
            ORDER BY id
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn find_attempt(&self, student_id: i64, schedule_id: i64) -> Result<Option<Attempt>, StoreError> {
        let sql = format!(
            "SELECT {} FROM student_exams WHERE student_id = $1 AND schedule_id = $2",
            ATTEMPT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(student_id)
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Attempt::try_from).transpose()
    }

    async fn find_attempt_by_id(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        let sql = format!("SELECT {} FROM student_exams WHERE id = $1", ATTEMPT_COLUMNS);
        let row = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Attempt::try_from).transpose()
    }

    async fn list_attempts_for_schedule(&self, schedule_id: i64) -> Result<Vec<Attempt>, StoreError> {
        let sql = format!(
            "SELECT {} FROM student_exams WHERE schedule_id = $1 ORDER BY id",
            ATTEMPT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(schedule_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Attempt::try_from).collect()
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<InsertOutcome, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO student_exams (
                student_id, exam_id, schedule_id, assigned_questions, answers,
                total_marks, passing_score, status, started_at, duration_ends_at, window_ends_at
            )
            VALUES ($1, $2, $3, $4, '{{}}'::jsonb, $5, $6, 'in_progress', $7, $8, $9)
            ON CONFLICT (student_id, schedule_id) DO NOTHING
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let created = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(attempt.student_id)
            .bind(attempt.exam_id)
            .bind(attempt.schedule_id)
            .bind(Json(&attempt.assigned_questions))
            .bind(attempt.total_marks)
            .bind(attempt.passing_score)
            .bind(attempt.started_at)
            .bind(attempt.duration_ends_at)
            .bind(attempt.window_ends_at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = created {
            return Ok(InsertOutcome::Created(Attempt::try_from(row)?));
        }

        let existing = self
            .find_attempt(attempt.student_id, attempt.schedule_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "attempt for student {} on schedule {} vanished after conflict",
                    attempt.student_id, attempt.schedule_id
                ))
            })?;

        Ok(InsertOutcome::Existing(existing))
    }

    async fn save_answers(&self, attempt_id: i64, answers: &HashMap<QuestionId, String>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE student_exams SET answers = $2 WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(attempt_id)
        .bind(Json(answers))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn finalize_attempt(&self, attempt_id: i64, completion: &Completion) -> Result<Option<Attempt>, StoreError> {
        let sql = format!(
            r#"
            UPDATE student_exams
            SET status = $2,
                answers = $3,
                score = $4,
                percentage = $5,
                passed = $6,
                completed_at = $7
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(attempt_id)
            .bind(completion.status.as_str())
            .bind(Json(&completion.answers))
            .bind(completion.score)
            .bind(completion.percentage)
            .bind(completion.passed)
            .bind(completion.completed_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Attempt::try_from).transpose()
    }
}
