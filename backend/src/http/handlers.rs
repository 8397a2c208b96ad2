//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::Html,
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    CheckRequest, CheckResponse, HealthResponse, JobStatusResponse, MessageResponse,
    StatusResponse, Student, StudentListResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::services::{check_runner, report, JobStatus};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the roster is readable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let roster_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "available".to_string(),
        Ok(false) => "unavailable".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        roster: roster_status,
    }))
}

// =============================================================================
// Report
// =============================================================================

/// GET /
///
/// Index page with the check form and the latest report.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.board.snapshot();
    Html(report::render_index_page(
        snapshot.report.as_deref(),
        snapshot.is_processing,
    ))
}

/// POST /check
///
/// Start a schedule check for a week. Only one check runs at a time.
pub async fn start_check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<(StatusCode, Json<CheckResponse>), AppError> {
    let week_start = request.week_start.trim().to_string();
    if week_start.is_empty() {
        return Err(AppError::BadRequest("Week start is required".to_string()));
    }

    if !state.board.try_begin() {
        return Err(AppError::Busy("A check is already running".to_string()));
    }

    let job_id = state.job_tracker.create_job(&week_start);
    let response_job_id = job_id.clone();

    tokio::spawn(check_runner::run_check_async(
        job_id,
        state.job_tracker.clone(),
        state.repository.clone(),
        state.ingestor.clone(),
        state.board.clone(),
        week_start,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(CheckResponse {
            success: true,
            message: format!(
                "Check started. Track progress at /v1/jobs/{}/logs",
                response_job_id
            ),
            job_id: response_job_id,
        }),
    ))
}

/// GET /status
///
/// Whether a check is running and the latest rendered report.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.board.snapshot())
}

// =============================================================================
// Job Management
// =============================================================================

/// GET /v1/jobs/{job_id}
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<JobStatusResponse> {
    let job = state
        .job_tracker
        .get_job(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        week_start: job.week_start,
        status: job.status,
        logs: job.logs,
        result: job.summary,
        error: job.error,
    }))
}

/// GET /v1/jobs/{job_id}/logs
///
/// Stream job logs via Server-Sent Events (SSE).
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.job_tracker.get_job(&job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let tracker = state.job_tracker.clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let fresh = tracker.logs_since(&job_id, sent);
            sent += fresh.len();
            for entry in &fresh {
                let data = serde_json::to_string(entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }

            match tracker.get_job(&job_id) {
                Some(job) if job.status != JobStatus::Running => {
                    // Lines written between the two reads
                    for entry in job.logs.iter().skip(sent) {
                        let data = serde_json::to_string(entry).unwrap_or_default();
                        yield Ok(Event::default().data(data));
                    }
                    let final_event = serde_json::json!({
                        "status": job.status,
                        "result": job.summary,
                        "error": job.error,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
                Some(_) => {}
                None => break,
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}

// =============================================================================
// Roster CRUD
// =============================================================================

/// GET /v1/students
///
/// Students sorted by year, then name.
pub async fn list_students(State(state): State<AppState>) -> HandlerResult<StudentListResponse> {
    let students = db_services::list_students(state.repository.as_ref()).await?;
    let total = students.len();
    Ok(Json(StudentListResponse { students, total }))
}

/// POST /v1/students
pub async fn create_student(
    State(state): State<AppState>,
    Json(student): Json<Student>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let stored = db_services::add_student(state.repository.as_ref(), student).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /v1/students/{name}
pub async fn get_student(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<Student> {
    let student = db_services::get_student(state.repository.as_ref(), &name).await?;
    Ok(Json(student))
}

/// PUT /v1/students/{name}
pub async fn update_student(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(student): Json<Student>,
) -> HandlerResult<Student> {
    let stored = db_services::update_student(state.repository.as_ref(), &name, student).await?;
    Ok(Json(stored))
}

/// DELETE /v1/students/{name}
pub async fn delete_student(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    db_services::delete_student(state.repository.as_ref(), &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Process Lifecycle
// =============================================================================

/// POST /shutdown
///
/// Acknowledge, then let the server drain and exit.
pub async fn shutdown(State(state): State<AppState>) -> Json<MessageResponse> {
    log::info!("Shutdown requested over HTTP");
    state.shutdown.notify_one();
    Json(MessageResponse {
        success: true,
        message: "Server is shutting down".to_string(),
    })
}
