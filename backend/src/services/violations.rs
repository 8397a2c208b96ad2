//! Daily load and gap rules over a student's week.
//!
//! A student's day is the set of lessons they attend on one date: their own
//! individual lessons plus the group lessons of their group.
//!
//! - **Load**: the sum of academic hours must not exceed [`MAX_DAILY_LOAD_HOURS`].
//! - **Gaps**: each period is split into two half-period slots; the empty
//!   slots between the first and the last occupied one must not exceed
//!   [`max_gaps_for_year`].

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Lesson, Student, Violation, ViolationKind};

/// Highest daily load, in academic hours, that is still allowed.
pub const MAX_DAILY_LOAD_HOURS: u32 = 10;

/// Highest number of empty half-periods allowed for first-year students.
pub const MAX_GAPS_FIRST_YEAR: u32 = 2;

/// Highest number of empty half-periods allowed from the second year on.
pub const MAX_GAPS: u32 = 4;

/// Gap allowance of a year of study.
pub fn max_gaps_for_year(year: u32) -> u32 {
    if year == 1 {
        MAX_GAPS_FIRST_YEAR
    } else {
        MAX_GAPS
    }
}

/// Sum of academic hours of a day's lessons.
pub fn daily_load<'a>(lessons: impl IntoIterator<Item = &'a Lesson>) -> u32 {
    lessons.into_iter().map(|lesson| lesson.time.hours).sum()
}

/// Empty half-period slots between the first and the last occupied one.
///
/// Returns 0 for an empty day.
pub fn count_gaps<'a>(lessons: impl IntoIterator<Item = &'a Lesson>) -> u32 {
    let occupied: BTreeSet<u32> = lessons
        .into_iter()
        .flat_map(|lesson| lesson.time.occupied_slots())
        .collect();

    match (occupied.first(), occupied.last()) {
        (Some(&min), Some(&max)) => {
            let span = max - min + 1;
            span - occupied.len() as u32
        }
        _ => 0,
    }
}

/// Checks student schedules against the daily rules.
pub struct ViolationDetector<'a> {
    lessons: &'a [Lesson],
}

impl<'a> ViolationDetector<'a> {
    pub fn new(lessons: &'a [Lesson]) -> Self {
        Self { lessons }
    }

    /// Lessons of `student`, grouped by date.
    pub fn schedule_by_date(&self, student: &Student) -> BTreeMap<NaiveDate, Vec<&'a Lesson>> {
        let mut days: BTreeMap<NaiveDate, Vec<&'a Lesson>> = BTreeMap::new();
        for lesson in self.lessons.iter().filter(|l| l.attended_by(student)) {
            days.entry(lesson.time.date).or_default().push(lesson);
        }
        days
    }

    /// Violations of one student, in date order, load before gaps.
    pub fn check_student(&self, student: &Student) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (date, day) in self.schedule_by_date(student) {
            let load = daily_load(day.iter().copied());
            if load > MAX_DAILY_LOAD_HOURS {
                violations.push(Violation::new(student, date, ViolationKind::LoadExceeded, load));
            }

            let gaps = count_gaps(day.iter().copied());
            if gaps > max_gaps_for_year(student.year) {
                violations.push(Violation::new(student, date, ViolationKind::GapsExceeded, gaps));
            }
        }

        violations
    }

    /// Violations of every student, sorted by (student name, date, kind).
    pub fn check_all(&self, students: &[Student]) -> Vec<Violation> {
        let mut violations: Vec<Violation> = students
            .iter()
            .flat_map(|student| self.check_student(student))
            .collect();

        violations.sort_by(|a, b| {
            (&a.student_name, a.date, a.kind).cmp(&(&b.student_name, b.date, b.kind))
        });
        violations
    }
}

/// Detect rule violations of `students` against `lessons`.
pub fn detect_violations(students: &[Student], lessons: &[Lesson]) -> Vec<Violation> {
    let violations = ViolationDetector::new(lessons).check_all(students);
    log::info!(
        "Checked {} student(s) against {} lesson(s): {} violation(s)",
        students.len(),
        lessons.len(),
        violations.len()
    );
    violations
}

#[cfg(test)]
#[path = "violations_tests.rs"]
mod tests;
