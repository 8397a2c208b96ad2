//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP handlers and the data sources: rule
//! checking, report rendering and the background check job.

pub mod check_runner;
pub mod job_tracker;
pub mod report;
pub mod violations;

pub use check_runner::{run_check_async, BoardSnapshot, CheckSummary, ReportBoard};
pub use job_tracker::{CheckJob, JobStatus, JobTracker, LogEntry, LogLevel};
pub use report::{render, render_index_page};
pub use violations::{detect_violations, ViolationDetector};
