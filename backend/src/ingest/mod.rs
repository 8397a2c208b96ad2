//! Lesson ingestion from the two schedule sources.
//!
//! - [`portal`] + [`group_schedule`]: group lessons from the university portal
//! - [`workbook`] + [`individual`]: individual lessons from `.xls` spreadsheets
//! - [`orchestrator`]: merges both, caching the portal half per week

pub mod cache;
pub mod error;
pub mod group_schedule;
pub mod individual;
pub mod orchestrator;
pub mod portal;
pub mod source;
pub mod workbook;

pub use cache::TtlCache;
pub use error::{CellError, FetchError, ParseError, WorkbookError};
pub use individual::IndividualScheduleParser;
pub use orchestrator::{GroupLessonCache, IngestOutcome, LessonIngestor, SourceFailure};
pub use portal::PortalClient;
pub use source::{GroupScheduleSource, IndividualScheduleSource};
