//! Data Transfer Objects for the HTTP API.

use serde::{Deserialize, Serialize};

pub use crate::models::Student;
pub use crate::services::BoardSnapshot as StatusResponse;

/// Request body of `POST /check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Week identifier forwarded to the portal and used as cache key
    #[serde(default)]
    pub week_start: String,
}

/// Response of `POST /check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub success: bool,
    pub message: String,
    /// Job ID for tracking the check
    pub job_id: String,
}

/// Generic acknowledgement, used by `POST /shutdown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Job status response for async processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    /// Job ID
    pub job_id: String,
    /// Week the check ran for
    pub week_start: String,
    /// Job status
    pub status: crate::services::JobStatus,
    /// Log entries
    pub logs: Vec<crate::services::LogEntry>,
    /// Summary if completed
    pub result: Option<crate::services::CheckSummary>,
    /// Reason if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Roster storage status
    pub roster: String,
}

/// Student list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
    pub total: usize,
}
