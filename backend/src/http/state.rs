//! Application state for the HTTP server.

use std::sync::Arc;
use tokio::sync::Notify;

use crate::db::StudentRepository;
use crate::ingest::LessonIngestor;
use crate::services::{JobTracker, ReportBoard};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Student roster
    pub repository: Arc<dyn StudentRepository>,
    /// Lesson ingestion over both schedule sources
    pub ingestor: LessonIngestor,
    /// Progress logs of check jobs
    pub job_tracker: JobTracker,
    /// Latest report and the "check running" flag
    pub board: ReportBoard,
    /// Notified by `POST /shutdown`
    pub shutdown: Arc<Notify>,
}

impl AppState {
    /// Create a new application state with the given roster and ingestor.
    pub fn new(repository: Arc<dyn StudentRepository>, ingestor: LessonIngestor) -> Self {
        Self {
            repository,
            ingestor,
            job_tracker: JobTracker::new(),
            board: ReportBoard::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
