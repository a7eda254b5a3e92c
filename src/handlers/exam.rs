// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine::EngineError,
    error::AppError,
    models::attempt::{StartAttemptResponse, SubmitAnswersRequest},
    services::attempt::AttemptService,
    utils::jwt::Claims,
};

/// Access verification: starts the caller's attempt on a schedule, or
/// resumes the one already assigned.
///
/// Returns the frozen question set without answer keys.
pub async fn access_schedule(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(schedule_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let attempt = attempts.start_attempt(student_id, schedule_id, Utc::now()).await?;

    Ok(Json(StartAttemptResponse::from(&attempt)))
}

/// Saves in-progress answers without scoring them.
pub async fn save_answers(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    payload: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| EngineError::InvalidAnswerShape(e.to_string()))?;

    let attempt = attempts
        .save_answers(attempt_id, student_id, req.answers, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "attemptId": attempt.id,
        "saved": attempt.answers.len(),
        "deadlineAt": attempt.deadline(),
    })))
}

/// Submits an attempt and returns its score.
///
/// * Rejects a second submission with 409.
/// * After the deadline, scores the recorded answers instead of the payload.
pub async fn submit_answers(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    payload: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| EngineError::InvalidAnswerShape(e.to_string()))?;

    let result = attempts
        .submit_answers(attempt_id, student_id, req.answers, Utc::now())
        .await?;

    Ok(Json(result))
}

/// Retrieves the caller's result for a finished attempt.
pub async fn get_result(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let result = attempts.get_result(attempt_id, student_id, Utc::now()).await?;

    Ok(Json(result))
}

/// Lists every scored attempt of a schedule.
/// Staff only.
pub async fn schedule_results(
    State(attempts): State<AttemptService>,
    Path(schedule_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let report = attempts.schedule_results(schedule_id, Utc::now()).await?;

    Ok(Json(report))
}
