//! Tracking of background schedule checks.
//!
//! Every `POST /check` becomes a [`CheckJob`]: the week it runs for, the
//! progress log streamed to clients over SSE, and once finished either the
//! [`CheckSummary`] or the error that stopped it. Jobs live in memory for the
//! lifetime of the process.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::check_runner::CheckSummary;

/// One progress line of a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// A schedule check and everything clients may ask about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckJob {
    pub job_id: String,
    /// Week identifier the check runs for
    pub week_start: String,
    pub status: JobStatus,
    pub logs: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Lesson and violation counts of a completed check
    pub summary: Option<CheckSummary>,
    /// Reason a failed check stopped
    pub error: Option<String>,
}

impl CheckJob {
    fn start(week_start: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            week_start: week_start.to_string(),
            status: JobStatus::Running,
            logs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            summary: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != JobStatus::Running
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// Shared registry of check jobs.
///
/// Updates addressed to an unknown job id are ignored.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, CheckJob>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running check for `week_start` and return its id.
    pub fn create_job(&self, week_start: &str) -> String {
        let job = CheckJob::start(week_start);
        let job_id = job.job_id.clone();
        self.jobs.write().insert(job_id.clone(), job);
        job_id
    }

    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) {
        self.update(job_id, |job| job.push_log(level, message.into()));
    }

    /// Mark the check completed with its summary.
    pub fn complete_job(&self, job_id: &str, summary: CheckSummary) {
        self.update(job_id, |job| {
            job.summary = Some(summary);
            job.finish(JobStatus::Completed);
        });
    }

    /// Mark the check failed; the error also becomes the last log line.
    pub fn fail_job(&self, job_id: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(job_id, |job| {
            job.push_log(LogLevel::Error, error.clone());
            job.error = Some(error);
            job.finish(JobStatus::Failed);
        });
    }

    pub fn get_job(&self, job_id: &str) -> Option<CheckJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Log entries from position `offset` on, for incremental streaming.
    pub fn logs_since(&self, job_id: &str, offset: usize) -> Vec<LogEntry> {
        self.jobs
            .read()
            .get(job_id)
            .map(|job| job.logs.iter().skip(offset).cloned().collect())
            .unwrap_or_default()
    }

    fn update(&self, job_id: &str, apply: impl FnOnce(&mut CheckJob)) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            apply(job);
        }
    }
}
