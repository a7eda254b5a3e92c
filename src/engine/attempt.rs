// src/engine/attempt.rs

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AssignedQuestion, EngineError, Exam, ExamSchedule, QuestionId, ScoreSheet};

/// Lifecycle of a student's exam instance.
///
/// "Not started" has no representation: it is the absence of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    /// The schedule window closed before submission.
    Expired,
    /// The allotted duration ran out before submission.
    Timeout,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Expired => "expired",
            AttemptStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "expired" => Ok(AttemptStatus::Expired),
            "timeout" => Ok(AttemptStatus::Timeout),
            other => Err(EngineError::UnknownStatus(other.to_string())),
        }
    }
}

/// An attempt about to be persisted for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub student_id: i64,
    pub exam_id: i64,
    pub schedule_id: i64,
    pub assigned_questions: Vec<AssignedQuestion>,
    pub total_marks: i32,
    pub passing_score: i32,
    pub started_at: DateTime<Utc>,
    pub duration_ends_at: Option<DateTime<Utc>>,
    pub window_ends_at: DateTime<Utc>,
}

impl NewAttempt {
    /// Starts an attempt around an already sampled snapshot.
    pub fn begin(
        student_id: i64,
        exam: &Exam,
        schedule: &ExamSchedule,
        assigned_questions: Vec<AssignedQuestion>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_marks = assigned_questions
            .iter()
            .fold(0i32, |total, q| total.saturating_add(q.marks));
        let duration_ends_at = exam
            .duration_minutes
            .filter(|m| *m > 0)
            .map(|m| now + Duration::minutes(i64::from(m)));

        Self {
            student_id,
            exam_id: exam.id,
            schedule_id: schedule.id,
            assigned_questions,
            total_marks,
            passing_score: exam.passing_score,
            started_at: now,
            duration_ends_at,
            window_ends_at: schedule.ends_at,
        }
    }
}

/// One student's sitting of one scheduled exam (the `student_exams` row).
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub schedule_id: i64,
    pub assigned_questions: Vec<AssignedQuestion>,
    pub answers: HashMap<QuestionId, String>,
    pub score: Option<i32>,
    pub total_marks: i32,
    pub percentage: Option<i32>,
    pub passed: Option<bool>,
    pub passing_score: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ends_at: Option<DateTime<Utc>>,
    pub window_ends_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The single write that moves an attempt into a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub status: AttemptStatus,
    pub answers: HashMap<QuestionId, String>,
    pub score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

impl Attempt {
    pub fn from_new(id: i64, new: NewAttempt) -> Self {
        Self {
            id,
            student_id: new.student_id,
            exam_id: new.exam_id,
            schedule_id: new.schedule_id,
            assigned_questions: new.assigned_questions,
            answers: HashMap::new(),
            score: None,
            total_marks: new.total_marks,
            percentage: None,
            passed: None,
            passing_score: new.passing_score,
            status: AttemptStatus::InProgress,
            started_at: new.started_at,
            duration_ends_at: new.duration_ends_at,
            window_ends_at: new.window_ends_at,
            completed_at: None,
        }
    }

    /// The earliest moment the attempt stops accepting work.
    pub fn deadline(&self) -> DateTime<Utc> {
        match self.duration_ends_at {
            Some(t) if t < self.window_ends_at => t,
            _ => self.window_ends_at,
        }
    }

    /// The terminal status an in-progress attempt has fallen into at `now`,
    /// if any. When both limits have passed the one reached first wins, and
    /// a tie is reported as `Timeout`.
    pub fn lapsed_status(&self, now: DateTime<Utc>) -> Option<AttemptStatus> {
        if self.status.is_terminal() || now < self.deadline() {
            return None;
        }
        match self.duration_ends_at {
            Some(t) if t <= self.window_ends_at => Some(AttemptStatus::Timeout),
            _ => Some(AttemptStatus::Expired),
        }
    }

    /// Builds the terminal write for this attempt.
    ///
    /// Fails with `AlreadySubmitted` if the attempt is already terminal.
    pub fn complete(
        &self,
        status: AttemptStatus,
        answers: HashMap<QuestionId, String>,
        sheet: &ScoreSheet,
        now: DateTime<Utc>,
    ) -> Result<Completion, EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::AlreadySubmitted { attempt_id: self.id });
        }
        if !status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: self.status.as_str(),
                to: status.as_str(),
            });
        }
        Ok(Completion {
            status,
            answers,
            score: sheet.score,
            percentage: sheet.percentage,
            passed: sheet.passed(self.passing_score),
            completed_at: now,
        })
    }

    /// Applies a completion in place. Used by stores that hold attempts in memory.
    pub fn apply(&mut self, completion: &Completion) {
        self.status = completion.status;
        self.answers = completion.answers.clone();
        self.score = Some(completion.score);
        self.percentage = Some(completion.percentage);
        self.passed = Some(completion.passed);
        self.completed_at = Some(completion.completed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DifficultyBucket, QuestionType, score_answers};

    fn exam(duration_minutes: Option<i32>) -> Exam {
        Exam {
            id: 1,
            title: "History".to_string(),
            total_questions: 2,
            shuffle_questions: false,
            shuffle_options: false,
            passing_score: 60,
            duration_minutes,
        }
    }

    fn schedule(start: DateTime<Utc>, hours: i64) -> ExamSchedule {
        ExamSchedule {
            id: 3,
            exam_id: 1,
            starts_at: start,
            ends_at: start + Duration::hours(hours),
        }
    }

    fn snapshot(id: i64, marks: i32) -> AssignedQuestion {
        AssignedQuestion {
            id,
            text: "Q".to_string(),
            question_type: QuestionType::FillBlank,
            options: None,
            correct_answer: "yes".to_string(),
            marks,
            difficulty: DifficultyBucket::Easy,
        }
    }

    fn attempt(duration_minutes: Option<i32>, window_hours: i64, now: DateTime<Utc>) -> Attempt {
        let new = NewAttempt::begin(
            9,
            &exam(duration_minutes),
            &schedule(now, window_hours),
            vec![snapshot(1, 4), snapshot(2, 6)],
            now,
        );
        Attempt::from_new(1, new)
    }

    #[test]
    fn test_begin_totals_snapshot_marks() {
        let a = attempt(Some(30), 2, Utc::now());
        assert_eq!(a.total_marks, 10);
        assert_eq!(a.status, AttemptStatus::InProgress);
        assert_eq!(a.passing_score, 60);
    }

    #[test]
    fn test_begin_total_saturates_instead_of_overflowing() {
        let now = Utc::now();
        let new = NewAttempt::begin(
            9,
            &exam(None),
            &schedule(now, 1),
            vec![snapshot(1, 2_000_000_000), snapshot(2, 2_000_000_000)],
            now,
        );
        assert_eq!(new.total_marks, i32::MAX);
    }

    #[test]
    fn test_duration_elapsing_first_is_a_timeout() {
        let now = Utc::now();
        let a = attempt(Some(30), 2, now);
        assert_eq!(a.deadline(), now + Duration::minutes(30));
        assert_eq!(a.lapsed_status(now + Duration::minutes(29)), None);
        assert_eq!(a.lapsed_status(now + Duration::minutes(30)), Some(AttemptStatus::Timeout));
        assert_eq!(a.lapsed_status(now + Duration::hours(3)), Some(AttemptStatus::Timeout));
    }

    #[test]
    fn test_window_closing_first_is_an_expiry() {
        let now = Utc::now();
        let a = attempt(Some(180), 1, now);
        assert_eq!(a.deadline(), now + Duration::hours(1));
        assert_eq!(a.lapsed_status(now + Duration::hours(1)), Some(AttemptStatus::Expired));
    }

    #[test]
    fn test_without_duration_only_the_window_applies() {
        let now = Utc::now();
        let a = attempt(None, 1, now);
        assert_eq!(a.duration_ends_at, None);
        assert_eq!(a.lapsed_status(now + Duration::minutes(59)), None);
        assert_eq!(a.lapsed_status(now + Duration::minutes(60)), Some(AttemptStatus::Expired));
    }

    #[test]
    fn test_simultaneous_limits_report_timeout() {
        let now = Utc::now();
        let a = attempt(Some(60), 1, now);
        assert_eq!(a.lapsed_status(now + Duration::hours(1)), Some(AttemptStatus::Timeout));
    }

    #[test]
    fn test_complete_then_apply_is_terminal() {
        let now = Utc::now();
        let mut a = attempt(Some(30), 2, now);
        let answers: HashMap<i64, String> = [(2, "YES".to_string())].into();
        let sheet = score_answers(&a.assigned_questions, &answers);

        let completion = a.complete(AttemptStatus::Completed, answers, &sheet, now).unwrap();
        assert_eq!(completion.score, 6);
        assert_eq!(completion.percentage, 60);
        assert!(completion.passed);

        a.apply(&completion);
        assert_eq!(a.status, AttemptStatus::Completed);
        assert_eq!(a.score, Some(6));
        assert_eq!(a.lapsed_status(now + Duration::hours(5)), None);

        let again = a.complete(AttemptStatus::Completed, HashMap::new(), &sheet, now);
        assert_eq!(again, Err(EngineError::AlreadySubmitted { attempt_id: 1 }));
    }

    #[test]
    fn test_complete_requires_terminal_target() {
        let now = Utc::now();
        let a = attempt(None, 1, now);
        let sheet = score_answers(&a.assigned_questions, &HashMap::new());
        assert!(matches!(
            a.complete(AttemptStatus::InProgress, HashMap::new(), &sheet, now),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_status_text_round_trip() {
        for s in [
            AttemptStatus::InProgress,
            AttemptStatus::Completed,
            AttemptStatus::Expired,
            AttemptStatus::Timeout,
        ] {
            assert_eq!(s.as_str().parse::<AttemptStatus>().unwrap(), s);
        }
        assert!("paused".parse::<AttemptStatus>().is_err());
    }
}
