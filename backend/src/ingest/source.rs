//! Seams between the orchestrator and the two schedule sources.

use async_trait::async_trait;

use super::error::{FetchError, ParseError};
use crate::models::Lesson;

/// Source of group lessons, one (department, group, week) at a time.
#[async_trait]
pub trait GroupScheduleSource: Send + Sync {
    /// Fetch the merged lessons of `group` in `department` for `week_start`.
    ///
    /// An empty `week_start` asks the source for its current week.
    async fn fetch(
        &self,
        department: &str,
        group: &str,
        week_start: &str,
    ) -> Result<Vec<Lesson>, FetchError>;
}

/// Source of individual lessons, parsed in one synchronous pass.
pub trait IndividualScheduleSource: Send + Sync {
    fn parse(&self) -> Result<Vec<Lesson>, ParseError>;
}
