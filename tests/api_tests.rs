// tests/api_tests.rs

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use cbt_backend::{
    config::Config,
    engine::{DifficultyBucket, Exam, ExamSchedule, Question, QuestionOption, QuestionType, SeededSource},
    routes,
    services::attempt::AttemptService,
    state::AppState,
    store::{ExamStore, MemoryStore},
    utils::jwt::sign_jwt,
};
use chrono::{Duration, Utc};

const JWT_SECRET: &str = "test_secret_for_integration_tests";
const SCHEDULE_ID: i64 = 1;
const CLOSED_SCHEDULE_ID: i64 = 2;

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
}

fn question(id: i64, question_type: QuestionType, difficulty: DifficultyBucket, marks: i32) -> Question {
    let (options, correct_answer) = match question_type {
        QuestionType::MultipleChoice => (
            Some(
                ["Mercury", "Venus", "Earth", "Mars"]
                    .iter()
                    .map(|t| QuestionOption {
                        text: t.to_string(),
                        is_correct: *t == "Mars",
                    })
                    .collect(),
            ),
            "Mars".to_string(),
        ),
        QuestionType::TrueFalse => (
            Some(vec![
                QuestionOption { text: "True".to_string(), is_correct: true },
                QuestionOption { text: "False".to_string(), is_correct: false },
            ]),
            "true".to_string(),
        ),
        QuestionType::FillBlank => (None, "Jupiter".to_string()),
    };

    Question {
        id,
        exam_id: 1,
        text: format!("Question {}", id),
        question_type,
        options,
        correct_answer,
        marks,
        difficulty,
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Seeds one open schedule (10 of 15 questions) and one closed schedule.
async fn spawn_app() -> TestApp {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());

    store
        .insert_exam(Exam {
            id: 1,
            title: "Astronomy".to_string(),
            total_questions: 10,
            shuffle_questions: true,
            shuffle_options: true,
            passing_score: 50,
            duration_minutes: Some(60),
        })
        .await;
    store
        .insert_schedule(ExamSchedule {
            id: SCHEDULE_ID,
            exam_id: 1,
            starts_at: now - Duration::minutes(10),
            ends_at: now + Duration::hours(2),
        })
        .await;
    store
        .insert_schedule(ExamSchedule {
            id: CLOSED_SCHEDULE_ID,
            exam_id: 1,
            starts_at: now - Duration::hours(3),
            ends_at: now - Duration::hours(1),
        })
        .await;

    let types = [QuestionType::MultipleChoice, QuestionType::TrueFalse, QuestionType::FillBlank];
    for i in 0..5 {
        let t = types[i as usize % 3];
        store.insert_question(question(100 + i, t, DifficultyBucket::Hard, 5)).await;
        store.insert_question(question(200 + i, t, DifficultyBucket::Medium, 3)).await;
        store.insert_question(question(300 + i, t, DifficultyBucket::Easy, 2)).await;
    }

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        sampling_seed: Some(3),
    };

    let state = AppState {
        attempts: AttemptService::new(store.clone(), Arc::new(SeededSource::new(3))),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, store }
}

fn bearer(id: i64, role: &str) -> String {
    format!("Bearer {}", sign_jwt(id, role, JWT_SECRET, 600).unwrap())
}

async fn access(client: &reqwest::Client, app: &TestApp, token: &str) -> reqwest::Response {
    client
        .post(&format!("{}/api/exams/schedules/{}/access", app.address, SCHEDULE_ID))
        .header("Authorization", token)
        .send()
        .await
        .expect("Failed to execute request")
}

fn answer_key(question_type: &str) -> &'static str {
    match question_type {
        "multiple_choice" => "Mars",
        "true_false" => "TRUE",
        _ => "  jupiter ",
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn access_requires_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/exams/schedules/{}/access", app.address, SCHEDULE_ID))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = access(&client, &app, "Bearer not-a-jwt").await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn access_hides_answer_keys_and_is_stable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = bearer(7, "student");

    let first: serde_json::Value = access(&client, &app, &token).await.json().await.unwrap();
    let second: serde_json::Value = access(&client, &app, &token).await.json().await.unwrap();

    assert_eq!(first["attemptId"], second["attemptId"]);
    assert_eq!(first["questions"], second["questions"]);
    assert_eq!(first["status"], "in_progress");
    assert_eq!(first["totalMarks"], 32);

    let questions = first["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    for q in questions {
        assert!(q.get("correctAnswer").is_none());
        assert!(q["questionType"].is_string());
    }
}

#[tokio::test]
async fn closed_schedule_cannot_start() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/exams/schedules/{}/access", app.address, CLOSED_SCHEDULE_ID))
        .header("Authorization", bearer(7, "student"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("closed"));
}

#[tokio::test]
async fn exam_flow_scores_against_assigned_questions() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = bearer(42, "student");

    // 1. Access verification assigns the questions
    let started: serde_json::Value = access(&client, &app, &token).await.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();
    let questions = started["questions"].as_array().unwrap();
    let assigned_marks: i64 = questions.iter().map(|q| q["marks"].as_i64().unwrap()).sum();

    // 2. Answer everything correctly except the first question
    let mut answers = HashMap::new();
    for q in questions.iter().skip(1) {
        let id = q["id"].as_i64().unwrap();
        answers.insert(id, answer_key(q["questionType"].as_str().unwrap()).to_string());
    }
    let first_marks = questions[0]["marks"].as_i64().unwrap();

    // 3. Save progress, then submit
    let saved = client
        .put(&format!("{}/api/exams/attempts/{}/answers", app.address, attempt_id))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status().as_u16(), 200);

    let submit = client
        .post(&format!("{}/api/exams/attempts/{}/submit", app.address, attempt_id))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 200);

    let result: serde_json::Value = submit.json().await.unwrap();
    assert_eq!(result["status"], "completed");
    assert_eq!(result["totalMarks"].as_i64().unwrap(), assigned_marks);
    assert_eq!(result["score"].as_i64().unwrap(), assigned_marks - first_marks);
    assert_eq!(result["questions"].as_array().unwrap().len(), 10);
    assert_eq!(result["questions"][0]["marksObtained"], 0);

    // 4. A second submission is rejected
    let again = client
        .post(&format!("{}/api/exams/attempts/{}/submit", app.address, attempt_id))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    // 5. The stored result is unchanged
    let stored: serde_json::Value = client
        .get(&format!("{}/api/exams/attempts/{}/result", app.address, attempt_id))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["score"], result["score"]);
    assert_eq!(stored["completedAt"], result["completedAt"]);
}

#[tokio::test]
async fn submit_with_foreign_question_is_bad_request() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = bearer(9, "student");

    let started: serde_json::Value = access(&client, &app, &token).await.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();

    let response = client
        .post(&format!("{}/api/exams/attempts/{}/submit", app.address, attempt_id))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "answers": { "123456": "Mars" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn malformed_answer_payload_is_bad_request() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = bearer(11, "student");

    let started: serde_json::Value = access(&client, &app, &token).await.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();
    let first_id = started["questions"][0]["id"].as_i64().unwrap();

    let bodies = [
        serde_json::json!({ "answers": { first_id.to_string(): 5 } }),
        serde_json::json!({ "answers": { "not-a-number": "Mars" } }),
        serde_json::json!({ "answers": ["Mars"] }),
    ];
    for route in ["answers", "submit"] {
        for body in &bodies {
            let url = format!("{}/api/exams/attempts/{}/{}", app.address, attempt_id, route);
            let request = if route == "answers" { client.put(&url) } else { client.post(&url) };
            let response = request.header("Authorization", &token).json(body).send().await.unwrap();

            assert_eq!(response.status().as_u16(), 400);
            let error: serde_json::Value = response.json().await.unwrap();
            assert!(error["error"].as_str().unwrap().starts_with("invalid answer payload"));
        }
    }

    // The attempt is still open for a well-formed submission
    let response = client
        .post(&format!("{}/api/exams/attempts/{}/submit", app.address, attempt_id))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "answers": { first_id.to_string(): "" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["score"], 0);
}

#[tokio::test]
async fn staff_token_cannot_open_an_attempt() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = access(&client, &app, &bearer(100, "tutor")).await;
    assert_eq!(response.status().as_u16(), 403);
    assert!(app.store.find_attempt(100, SCHEDULE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn result_of_other_student_is_hidden() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = access(&client, &app, &bearer(1, "student")).await.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();

    let response = client
        .get(&format!("{}/api/exams/attempts/{}/result", app.address, attempt_id))
        .header("Authorization", bearer(2, "student"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn schedule_report_is_staff_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let student = bearer(5, "student");

    let started: serde_json::Value = access(&client, &app, &student).await.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();
    client
        .post(&format!("{}/api/exams/attempts/{}/submit", app.address, attempt_id))
        .header("Authorization", &student)
        .json(&serde_json::json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    access(&client, &app, &bearer(6, "student")).await;

    let url = format!("{}/api/exams/schedules/{}/results", app.address, SCHEDULE_ID);

    let forbidden = client.get(&url).header("Authorization", &student).send().await.unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let report: serde_json::Value = client
        .get(&url)
        .header("Authorization", bearer(100, "tutor"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["inProgress"], 1);
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["studentId"], 5);
    assert_eq!(results[0]["score"], 0);

    let stored = app.store.find_attempt(6, SCHEDULE_ID).await.unwrap();
    assert!(stored.is_some());
}
