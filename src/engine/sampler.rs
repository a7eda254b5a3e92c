// src/engine/sampler.rs

use std::{
    collections::{BTreeMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{
    DifficultyBucket, EngineError, Exam, MAX_QUESTION_MARKS, Question, QuestionId, QuestionOption,
    QuestionType, compute_bucket_sizes,
};

/// Supplies the generator used for one assignment.
///
/// Injected into the service so tests and reproducible deployments can pin
/// the exact sample composition.
pub trait RandomSource: Send + Sync {
    fn rng(&self) -> StdRng;
}

/// OS-seeded generator for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn rng(&self) -> StdRng {
        StdRng::from_entropy()
    }
}

/// Deterministic generator: the n-th draw is seeded with `seed + n`.
#[derive(Debug)]
pub struct SeededSource {
    seed: u64,
    draws: AtomicU64,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: AtomicU64::new(0) }
    }
}

impl RandomSource for SeededSource {
    fn rng(&self) -> StdRng {
        let n = self.draws.fetch_add(1, Ordering::Relaxed);
        StdRng::seed_from_u64(self.seed.wrapping_add(n))
    }
}

/// Frozen value-copy of a question, embedded in an attempt.
///
/// Owns its data outright; edits to the source question never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedQuestion {
    pub id: QuestionId,
    pub text: String,
    pub question_type: QuestionType,
    /// Options in the order they are presented to the student.
    pub options: Option<Vec<QuestionOption>>,
    pub correct_answer: String,
    pub marks: i32,
    pub difficulty: DifficultyBucket,
}

impl From<&Question> for AssignedQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            correct_answer: q.answer_key(),
            marks: q.marks,
            difficulty: q.difficulty,
        }
    }
}

/// Draws the per-student question set for `exam` out of `pool`.
///
/// Questions are grouped by difficulty, each group is sampled without
/// replacement to the size `compute_bucket_sizes` allots it, and the groups
/// are concatenated hard → medium → easy. The exam's shuffle flags then
/// reorder the whole sequence and the options of multiple-choice questions.
pub fn assign_questions<R>(exam: &Exam, pool: &[Question], rng: &mut R) -> Result<Vec<AssignedQuestion>, EngineError>
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(EngineError::EmptyQuestionPool { exam_id: exam.id });
    }

    let mut seen = HashSet::with_capacity(pool.len());
    let mut groups: BTreeMap<DifficultyBucket, Vec<&Question>> = BTreeMap::new();
    for question in pool {
        if !seen.insert(question.id) {
            return Err(EngineError::DuplicateQuestion(question.id));
        }
        if !(1..=MAX_QUESTION_MARKS).contains(&question.marks) {
            return Err(EngineError::InvalidMarks {
                question_id: question.id,
                marks: question.marks,
            });
        }
        groups.entry(question.difficulty).or_default().push(question);
    }

    let target = if exam.total_questions > 0 {
        exam.total_questions as usize
    } else {
        pool.len()
    };
    let counts: BTreeMap<DifficultyBucket, usize> = groups.iter().map(|(k, v)| (*k, v.len())).collect();
    let sizes = compute_bucket_sizes(&counts, target);

    let mut drawn: Vec<&Question> = Vec::with_capacity(target.min(pool.len()));
    for (bucket, mut questions) in groups {
        let take = sizes.get(&bucket).copied().unwrap_or(0);
        questions.shuffle(rng);
        drawn.extend(questions.into_iter().take(take));
    }

    if exam.shuffle_questions {
        drawn.shuffle(rng);
    }

    let mut assigned: Vec<AssignedQuestion> = drawn.into_iter().map(AssignedQuestion::from).collect();

    if exam.shuffle_options {
        for question in assigned
            .iter_mut()
            .filter(|q| q.question_type == QuestionType::MultipleChoice)
        {
            if let Some(options) = question.options.as_mut() {
                options.shuffle(rng);
            }
        }
    }

    Ok(assigned)
}
