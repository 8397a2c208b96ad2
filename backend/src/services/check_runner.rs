//! Background schedule check.
//!
//! A check loads the roster, ingests the week's lessons from both schedule
//! sources, detects violations and renders the report. Progress is logged to
//! the job tracker so clients can follow it over SSE; the rendered report is
//! published on the [`ReportBoard`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::services as db_services;
use crate::db::StudentRepository;
use crate::ingest::LessonIngestor;
use crate::services::job_tracker::{JobTracker, LogLevel};
use crate::services::{report, violations};

#[derive(Debug, Default)]
struct BoardState {
    is_processing: bool,
    report: Option<String>,
}

/// Point-in-time view of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub is_processing: bool,
    pub report_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

/// Latest rendered report plus the "check running" flag.
///
/// Only one check runs at a time; [`ReportBoard::try_begin`] claims the slot.
/// While a check runs the previous report is withheld, so readers never see
/// a report for a different week as ready.
#[derive(Clone, Default)]
pub struct ReportBoard {
    state: Arc<Mutex<BoardState>>,
}

impl ReportBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the processing slot. Returns `false` if a check is already running.
    pub fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_processing {
            return false;
        }
        state.is_processing = true;
        true
    }

    /// Release the slot, publishing `report` when the check produced one.
    ///
    /// A failed check keeps the previous report.
    pub fn finish(&self, report: Option<String>) {
        let mut state = self.state.lock();
        state.is_processing = false;
        if report.is_some() {
            state.report = report;
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.state.lock();
        let report = if state.is_processing {
            None
        } else {
            state.report.clone()
        };
        BoardSnapshot {
            is_processing: state.is_processing,
            report_ready: report.is_some(),
            report,
        }
    }
}

/// Summary stored on the completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub week_start: String,
    pub students: usize,
    pub lessons: usize,
    pub individual_lessons: usize,
    pub group_lessons: usize,
    pub group_cache_hit: bool,
    pub violations: usize,
    pub skipped_sources: Vec<crate::ingest::SourceFailure>,
}

/// Run a full check for `week_start`.
///
/// Designed to be spawned as a background task after [`ReportBoard::try_begin`]
/// succeeded; the board slot is released on every path.
///
/// # Arguments
/// * `job_id` - The job ID for tracking progress
/// * `tracker` - Job tracker for logging
/// * `roster` - Roster repository
/// * `ingestor` - Lesson ingestion over both schedule sources
/// * `board` - Board receiving the rendered report
/// * `week_start` - Week identifier supplied by the client
///
/// # Returns
/// * Check summary on success, or error message on failure
pub async fn run_check_async(
    job_id: String,
    tracker: JobTracker,
    roster: Arc<dyn StudentRepository>,
    ingestor: LessonIngestor,
    board: ReportBoard,
    week_start: String,
) -> Result<CheckSummary, String> {
    let result = run_check(&job_id, &tracker, roster.as_ref(), &ingestor, &week_start).await;
    match result {
        Ok((summary, html)) => {
            board.finish(Some(html));
            tracker.complete_job(&job_id, summary.clone());
            log::info!(
                "Check {} finished: {} violation(s) over {} lesson(s)",
                job_id,
                summary.violations,
                summary.lessons
            );
            Ok(summary)
        }
        Err(msg) => {
            board.finish(None);
            tracker.fail_job(&job_id, &msg);
            log::warn!("Check {} failed: {}", job_id, msg);
            Err(msg)
        }
    }
}

async fn run_check(
    job_id: &str,
    tracker: &JobTracker,
    roster: &dyn StudentRepository,
    ingestor: &LessonIngestor,
    week_start: &str,
) -> Result<(CheckSummary, String), String> {
    tracker.log(
        job_id,
        LogLevel::Info,
        format!("Starting schedule check for week '{}'...", week_start),
    );

    // Step 1: Roster
    tracker.log(job_id, LogLevel::Info, "Loading student roster...");
    let students = db_services::load_roster(roster)
        .await
        .map_err(|e| format!("Failed to load roster: {}", e))?;
    tracker.log(
        job_id,
        LogLevel::Success,
        format!("✓ Loaded {} students", students.len()),
    );
    if students.is_empty() {
        tracker.log(
            job_id,
            LogLevel::Warning,
            "Roster is empty, nothing to check",
        );
    }

    // Step 2: Lessons
    tracker.log(job_id, LogLevel::Info, "Collecting lessons...");
    let outcome = ingestor.ingest(&students, week_start).await;
    for failure in &outcome.failures {
        tracker.log(
            job_id,
            LogLevel::Warning,
            format!("Skipped {}: {}", failure.unit, failure.reason),
        );
    }
    tracker.log(
        job_id,
        LogLevel::Success,
        format!(
            "✓ Collected {} lessons ({} individual, {} group{})",
            outcome.lessons.len(),
            outcome.individual_count,
            outcome.group_count,
            if outcome.group_cache_hit { ", cached" } else { "" }
        ),
    );

    // Step 3: Detection, off the async workers
    tracker.log(job_id, LogLevel::Info, "Checking load and gap rules...");
    let lessons = outcome.lessons;
    let (found, html, student_count, lesson_count) = tokio::task::spawn_blocking(move || {
        let found = violations::detect_violations(&students, &lessons);
        let html = report::render(&found, &lessons);
        (found, html, students.len(), lessons.len())
    })
    .await
    .map_err(|e| format!("Detection task panic: {}", e))?;

    tracker.log(
        job_id,
        if found.is_empty() {
            LogLevel::Success
        } else {
            LogLevel::Warning
        },
        format!("✓ Found {} violations", found.len()),
    );
    tracker.log(job_id, LogLevel::Success, "✓ Report ready");

    let summary = CheckSummary {
        week_start: week_start.to_string(),
        students: student_count,
        lessons: lesson_count,
        individual_lessons: outcome.individual_count,
        group_lessons: outcome.group_count,
        group_cache_hit: outcome.group_cache_hit,
        violations: found.len(),
        skipped_sources: outcome.failures,
    };
    Ok((summary, html))
}
