// src/error.rs

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{engine::EngineError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    /// Typed failure from the exam core; status depends on the variant.
    Exam(EngineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Exam(err) => write!(f, "{}", err),
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

fn exam_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidAnswerShape(_) => StatusCode::BAD_REQUEST,
        EngineError::ScheduleNotOpen { .. } | EngineError::ScheduleClosed { .. } => StatusCode::FORBIDDEN,
        EngineError::AttemptExpired { .. } => StatusCode::GONE,
        EngineError::EmptyQuestionPool { .. }
        | EngineError::AlreadyStarted { .. }
        | EngineError::AlreadySubmitted { .. }
        | EngineError::AttemptInProgress { .. } => StatusCode::CONFLICT,
        EngineError::UnknownQuestionType(_)
        | EngineError::UnknownDifficulty(_)
        | EngineError::UnknownStatus(_)
        | EngineError::InvalidTransition { .. }
        | EngineError::DuplicateQuestion(_)
        | EngineError::InvalidMarks { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Exam(err) => {
                let status = exam_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Exam core failure: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Exam(err)
    }
}

/// A body that does not deserialize into the expected answer map is a
/// malformed submission, not an extractor failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Exam(EngineError::InvalidAnswerShape(rejection.body_text()))
    }
}

/// Converts `StoreError` into `AppError::InternalServerError`.
/// Allows using `?` operator on store calls.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}
