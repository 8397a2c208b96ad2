use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::LessonTime;

/// A student on the administrator's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Full display name, unique within the roster
    pub name: String,
    /// Class group code, e.g. `МД-21-о`
    pub group: String,
    /// Department (faculty) name as listed on the schedule portal
    pub department: String,
    /// Year of study, starting at 1
    pub year: u32,
}

impl Student {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        department: impl Into<String>,
        year: u32,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            department: department.into(),
            year,
        }
    }
}

/// A single lesson from either schedule source.
///
/// A lesson with a non-empty `student` is individual and belongs to that
/// student only; otherwise it belongs to every student of `group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub time: LessonTime,
    pub discipline: String,
    pub instructor: String,
    pub room: String,
    pub group: String,
    #[serde(default)]
    pub student: String,
}

impl Lesson {
    pub fn is_individual(&self) -> bool {
        !self.student.is_empty()
    }

    /// Whether the lesson is part of `student`'s schedule.
    pub fn attended_by(&self, student: &Student) -> bool {
        if self.is_individual() {
            self.student == student.name
        } else {
            self.group == student.group
        }
    }
}

/// Kind of schedule rule a student's day breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Daily load above the allowed number of academic hours
    LoadExceeded,
    /// Too many empty half-periods between the first and last lesson
    GapsExceeded,
}

impl ViolationKind {
    /// Label shown in the report.
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadExceeded => "Превышение нагрузки",
            Self::GapsExceeded => "Превышение окон",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rule violation on one day of one student's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub student_name: String,
    pub group: String,
    pub year: u32,
    pub date: NaiveDate,
    pub kind: ViolationKind,
    /// Total academic hours for a load violation, empty half-periods for a gap violation
    pub hours: u32,
}

impl Violation {
    pub fn new(student: &Student, date: NaiveDate, kind: ViolationKind, hours: u32) -> Self {
        Self {
            student_name: student.name.clone(),
            group: student.group.clone(),
            year: student.year,
            date,
            kind,
            hours,
        }
    }
}
