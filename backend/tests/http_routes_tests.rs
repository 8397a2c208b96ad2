//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use lesson_audit::db::repositories::LocalRepository;
use lesson_audit::http::{create_router, AppState};
use lesson_audit::ingest::{
    FetchError, GroupLessonCache, GroupScheduleSource, IndividualScheduleSource, LessonIngestor,
    ParseError,
};
use lesson_audit::models::{Lesson, Student};

struct EmptyPortal;

#[async_trait]
impl GroupScheduleSource for EmptyPortal {
    async fn fetch(&self, _: &str, _: &str, _: &str) -> Result<Vec<Lesson>, FetchError> {
        Ok(Vec::new())
    }
}

struct EmptySheets;

impl IndividualScheduleSource for EmptySheets {
    fn parse(&self) -> Result<Vec<Lesson>, ParseError> {
        Ok(Vec::new())
    }
}

fn state_with(students: Vec<Student>) -> AppState {
    let ingestor = LessonIngestor::new(
        Arc::new(EmptyPortal),
        Arc::new(EmptySheets),
        Arc::new(GroupLessonCache::new(Duration::from_secs(60))),
    );
    AppState::new(Arc::new(LocalRepository::with_students(students)), ingestor)
}

fn app() -> Router {
    create_router(state_with(Vec::new()))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn student_json(name: &str, year: u32) -> Value {
    json!({"name": name, "group": "МД-21-о", "department": "Музыкальный", "year": year})
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["roster"], "available");
}

#[tokio::test]
async fn test_index_page() {
    let (status, body) = send(app(), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<form id=\"check-form\">"));
}

#[tokio::test]
async fn test_status_before_any_check() {
    let (status, body) = send(app(), "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"isProcessing": false, "reportReady": false})
    );
}

#[tokio::test]
async fn test_check_requires_week() {
    let (status, body) = send(app(), "POST", "/check", Some(json!({"weekStart": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_check_rejected_while_running() {
    let state = state_with(Vec::new());
    assert!(state.board.try_begin());
    let app = create_router(state);

    let (status, body) = send(app, "POST", "/check", Some(json!({"weekStart": "2025-03-10"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(&body)["code"], "CHECK_IN_PROGRESS");
}

#[tokio::test]
async fn test_check_runs_to_completion() {
    let state = state_with(vec![Student::new("Иванов И.И.", "МД-21-о", "Музыкальный", 2)]);
    let tracker = state.job_tracker.clone();
    let board = state.board.clone();
    let app = create_router(state);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/check",
        Some(json!({"weekStart": "2025-03-10"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let body = json_body(&body);
    assert_eq!(body["success"], true);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    for _ in 0..100 {
        if tracker.get_job(&job_id).is_some_and(|job| job.is_finished()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (status, body) = send(app.clone(), "GET", &format!("/v1/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let job = json_body(&body);
    assert_eq!(job["status"], "completed");
    assert_eq!(job["week_start"], "2025-03-10");
    assert_eq!(job["result"]["violations"], 0);

    assert!(board.snapshot().report_ready);
    let (_, body) = send(app, "GET", "/status", None).await;
    let status_body = json_body(&body);
    assert_eq!(status_body["reportReady"], true);
    assert!(status_body["report"]
        .as_str()
        .unwrap()
        .contains("Нарушений в расписании не найдено"));
}

#[tokio::test]
async fn test_unknown_job() {
    let (status, _) = send(app(), "GET", "/v1/jobs/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app(), "GET", "/v1/jobs/missing/logs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_crud() {
    let app = app();

    let (status, _) = send(app.clone(), "POST", "/v1/students", Some(student_json("Иванов И.И.", 2))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app.clone(), "POST", "/v1/students", Some(student_json("Иванов И.И.", 2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body)["code"], "ALREADY_EXISTS");

    let (status, _) = send(app.clone(), "POST", "/v1/students", Some(student_json("Абрамов А.А.", 1))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(app.clone(), "GET", "/v1/students", None).await;
    let list = json_body(&body);
    assert_eq!(list["total"], 2);
    assert_eq!(list["students"][0]["name"], "Абрамов А.А.");

    let uri = "/v1/students/%D0%98%D0%B2%D0%B0%D0%BD%D0%BE%D0%B2%20%D0%98.%D0%98.";
    let (status, body) = send(app.clone(), "PUT", uri, Some(student_json("Иванов И.И.", 3))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["year"], 3);

    let (status, body) = send(app.clone(), "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["year"], 3);

    let (status, _) = send(app.clone(), "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_student_validation() {
    let (status, body) = send(app(), "POST", "/v1/students", Some(student_json("Иванов И.И.", 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_shutdown_notifies() {
    let state = state_with(Vec::new());
    let shutdown = Arc::clone(&state.shutdown);
    let app = create_router(state);

    let (status, body) = send(app, "POST", "/shutdown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["success"], true);

    // notify_one stores a permit when nobody is waiting yet
    tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
        .await
        .unwrap();
}
