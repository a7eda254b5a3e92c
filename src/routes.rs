// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::exam,
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Student routes: access verification, progress save, submit, result.
/// * Staff routes: schedule-wide results.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let student_routes = Router::new()
        .route("/schedules/{schedule_id}/access", post(exam::access_schedule))
        .route("/attempts/{attempt_id}/answers", put(exam::save_answers))
        .route("/attempts/{attempt_id}/submit", post(exam::submit_answers))
        .route("/attempts/{attempt_id}/result", get(exam::get_result))
        .layer(middleware::from_fn(student_middleware));

    let staff_routes = Router::new()
        .route("/schedules/{schedule_id}/results", get(exam::schedule_results))
        .layer(middleware::from_fn(staff_middleware));

    let exam_routes = Router::new()
        .merge(student_routes)
        .merge(staff_routes)
        // Auth runs before the staff check
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/exams", exam_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
