//! Ingestion orchestrator.
//!
//! Collects the week's lessons for a roster from both sources:
//!
//! - the individual spreadsheets, parsed once on the blocking pool;
//! - the portal, fetched once per (department, group) pair of the roster,
//!   one task per pair, unless the cache already holds the week.
//!
//! Source failures never abort a run. They are logged, reported in
//! [`IngestOutcome::failures`], and the affected lessons are left out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::cache::TtlCache;
use super::source::{GroupScheduleSource, IndividualScheduleSource};
use crate::models::{Lesson, Student};

/// Cache of merged group lessons keyed by week identifier.
pub type GroupLessonCache = TtlCache<String, Vec<Lesson>>;

/// One unit of ingestion that produced no lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// What failed: `"individual schedule"` or `"<department> / <group>"`
    pub unit: String,
    pub reason: String,
}

/// Lessons of one ingestion run with per-source bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub lessons: Vec<Lesson>,
    pub individual_count: usize,
    pub group_count: usize,
    /// Group lessons came from the cache instead of the portal
    pub group_cache_hit: bool,
    pub failures: Vec<SourceFailure>,
}

/// Distinct departments and groups of a roster, in sorted order.
pub fn roster_scope(students: &[Student]) -> (BTreeSet<String>, BTreeSet<String>) {
    let departments = students.iter().map(|s| s.department.clone()).collect();
    let groups = students.iter().map(|s| s.group.clone()).collect();
    (departments, groups)
}

/// Merges both schedule sources into one lesson set.
#[derive(Clone)]
pub struct LessonIngestor {
    groups: Arc<dyn GroupScheduleSource>,
    individual: Arc<dyn IndividualScheduleSource>,
    cache: Arc<GroupLessonCache>,
}

impl LessonIngestor {
    pub fn new(
        groups: Arc<dyn GroupScheduleSource>,
        individual: Arc<dyn IndividualScheduleSource>,
        cache: Arc<GroupLessonCache>,
    ) -> Self {
        Self {
            groups,
            individual,
            cache,
        }
    }

    /// Collect all lessons relevant to `students` for `week_start`.
    ///
    /// # Arguments
    /// * `students` - Roster the department and group sets are derived from
    /// * `week_start` - Week identifier, passed to the portal and used as cache key
    ///
    /// # Returns
    /// Individual lessons followed by group lessons. Always succeeds; an
    /// outcome may hold no lessons at all.
    pub async fn ingest(&self, students: &[Student], week_start: &str) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        let individual = Arc::clone(&self.individual);
        let individual_task = tokio::task::spawn_blocking(move || individual.parse());

        let group_lessons = match self.cache.get(&week_start.to_string()) {
            Some(cached) => {
                log::info!(
                    "Using {} cached group lessons for week '{}'",
                    cached.len(),
                    week_start
                );
                outcome.group_cache_hit = true;
                cached
            }
            None => {
                let lessons = self
                    .fetch_groups(students, week_start, &mut outcome.failures)
                    .await;
                self.cache.insert(week_start.to_string(), lessons.clone());
                lessons
            }
        };

        match individual_task.await {
            Ok(Ok(lessons)) => {
                log::info!("Parsed {} individual lessons", lessons.len());
                outcome.individual_count = lessons.len();
                outcome.lessons.extend(lessons);
            }
            Ok(Err(e)) => {
                log::warn!("Individual schedule skipped: {}", e);
                outcome.failures.push(SourceFailure {
                    unit: "individual schedule".to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                log::warn!("Individual schedule task failed: {}", e);
                outcome.failures.push(SourceFailure {
                    unit: "individual schedule".to_string(),
                    reason: e.to_string(),
                });
            }
        }

        outcome.group_count = group_lessons.len();
        outcome.lessons.extend(group_lessons);
        outcome
    }

    /// Fetch every (department, group) pair concurrently and join the results.
    async fn fetch_groups(
        &self,
        students: &[Student],
        week_start: &str,
        failures: &mut Vec<SourceFailure>,
    ) -> Vec<Lesson> {
        let (departments, groups) = roster_scope(students);
        log::info!(
            "Fetching group schedules for {} department(s) x {} group(s), week '{}'",
            departments.len(),
            groups.len(),
            week_start
        );

        let mut tasks = JoinSet::new();
        for department in &departments {
            for group in &groups {
                let source = Arc::clone(&self.groups);
                let department = department.clone();
                let group = group.clone();
                let week_start = week_start.to_string();
                tasks.spawn(async move {
                    let result = source.fetch(&department, &group, &week_start).await;
                    (department, group, result)
                });
            }
        }

        let mut lessons = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, _, Ok(fetched))) => lessons.extend(fetched),
                Ok((department, group, Err(e))) if e.is_lookup_miss() => {
                    log::debug!("{} / {}: {}", department, group, e);
                }
                Ok((department, group, Err(e))) => {
                    log::warn!("Group schedule for {} / {} skipped: {}", department, group, e);
                    failures.push(SourceFailure {
                        unit: format!("{} / {}", department, group),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    log::warn!("Group fetch task failed: {}", e);
                    failures.push(SourceFailure {
                        unit: "group fetch".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Completion order is arbitrary
        lessons.sort_by(|a, b| {
            (&a.group, a.time.date, a.time.number, &a.discipline)
                .cmp(&(&b.group, b.time.date, b.time.number, &b.discipline))
        });
        lessons
    }
}
