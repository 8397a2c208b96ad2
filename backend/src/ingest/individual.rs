//! Parser for the individual-lesson spreadsheets.
//!
//! Each sheet holds one weekly block per instructor. Offsets are relative
//! to the row whose first cell starts with `Преподаватель`:
//!
//! ```text
//! row +0   Преподаватель Петров А.А.  Подпись ____
//! row +1   ...                              col 7: period with the 4-digit year
//! row +3   day headers at cols 2, 5, 8, ... (stride 3, stop at first empty)
//! row +4   "Дата: 10.03." under each day header
//! row +6.. col 1: period number | day col: student(s) | day col + 1: discipline (room) group
//! ```
//!
//! A student cell names one student (both halves of the period) or two
//! students split by `/` (one half each). Every name becomes a half-period
//! record; [`merge_instructors`] and [`rejoin_halves`] then fold them back
//! into lessons.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::error::{CellError, ParseError};
use super::source::IndividualScheduleSource;
use super::workbook::{discover_workbooks, open_first_sheet, CellGrid};
use crate::models::{Lesson, LessonTime, PairHalf};

// ============================================================================
// Sheet layout
// ============================================================================

/// Label opening an instructor block in column 0.
pub const INSTRUCTOR_LABEL: &str = "Преподаватель";

/// Instructor name used when the block label does not match the expected pattern.
pub const UNKNOWN_INSTRUCTOR: &str = "Unknown";

const DAY_HEADER_OFFSET: usize = 3;
const DATE_OFFSET: usize = 4;
const YEAR_OFFSET: usize = 1;
const YEAR_COLUMN: usize = 7;
const LESSONS_OFFSET: usize = 6;
const PERIOD_COLUMN: usize = 1;
const FIRST_DAY_COLUMN: usize = 2;
const DAY_COLUMN_STRIDE: usize = 3;
const DAY_COLUMN_LIMIT: usize = 30;

/// Prefix the room number is formatted with.
pub const ROOM_PREFIX: &str = "К3-";

/// Academic hours of a single half-period record.
pub const HALF_LESSON_HOURS: u32 = 1;

/// Academic hours of a rejoined full period.
pub const FULL_LESSON_HOURS: u32 = 2;

/// Bell schedule: period number → (start, end).
const PERIOD_CLOCK: [(u32, (u32, u32), (u32, u32)); 7] = [
    (1, (8, 30), (10, 0)),
    (2, (10, 10), (11, 40)),
    (3, (11, 50), (13, 20)),
    (4, (13, 40), (15, 10)),
    (5, (15, 20), (16, 50)),
    (6, (16, 55), (18, 25)),
    (7, (18, 30), (20, 0)),
];

/// Disciplines that never count towards a student's load.
const IGNORED_DISCIPLINES: [&str; 2] = ["Народный танец (практикум)", "Народный танец"];

/// Abbreviated spellings used by the schedule office → canonical name.
const DISCIPLINE_ALIASES: [(&str, &str); 11] = [
    ("Дир.хор.подг.", "Дирижирование"),
    ("Хор.дир.", "Дирижирование"),
    ("Муз.инстр.испол.", "Муз. Инструмент"),
    ("Муз.инстр.подг.", "Муз. Инструмент"),
    ("Муз.инстр.подгот.", "Муз. Инструмент"),
    ("Муз.инстр.исполн.", "Муз. Инструмент"),
    ("Муз.инстр.подготов.", "Муз. Инструмент"),
    ("Вокал.", "Вокал"),
    ("Вокал. исполн.", "Вокал"),
    ("Вокал. подг.", "Вокал"),
    ("Аккомпанемент", "Аккомпанемент"),
];

static INSTRUCTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Преподаватель\s*(\p{L}+)\s*(\p{L}\.\p{L}\.)(?:\s*Подпись.*)?")
        .expect("valid regex")
});
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));
static PARENTHESIZED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*?\)").expect("valid regex"));
static GROUP_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(МД-\d{2}-о)\s*").expect("valid regex"));
static ROOM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?(\d{2,3}).*?\)").expect("valid regex"));
static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(МД-\d{2}-о)").expect("valid regex"));

// ============================================================================
// Parser
// ============================================================================

/// Parses every `.xls` file found under a root directory.
#[derive(Debug, Clone)]
pub struct IndividualScheduleParser {
    root: PathBuf,
}

impl IndividualScheduleParser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parse all spreadsheets under the root into merged individual lessons.
    ///
    /// Files that cannot be opened, or have no sheet, are skipped.
    ///
    /// # Errors
    /// * [`ParseError::NoInputFiles`] / [`ParseError::Discovery`] from the directory scan
    /// * [`ParseError::NoLessons`] if no file yields a single record
    pub fn parse_files(&self) -> Result<Vec<Lesson>, ParseError> {
        let files = discover_workbooks(&self.root)?;
        log::info!(
            "Parsing {} individual schedule file(s) under {}",
            files.len(),
            self.root.display()
        );

        let mut records = Vec::new();
        for path in &files {
            match open_first_sheet(path) {
                Ok(Some(sheet)) => {
                    let before = records.len();
                    records.extend(parse_sheet(&sheet));
                    log::debug!("{}: {} record(s)", path.display(), records.len() - before);
                }
                Ok(None) => log::debug!("{}: workbook has no sheets, skipping", path.display()),
                Err(e) => log::debug!("Skipping {}", e),
            }
        }

        if records.is_empty() {
            return Err(ParseError::NoLessons(files.len()));
        }

        Ok(rejoin_halves(merge_instructors(records)))
    }
}

impl IndividualScheduleSource for IndividualScheduleParser {
    fn parse(&self) -> Result<Vec<Lesson>, ParseError> {
        self.parse_files()
    }
}

/// Extract the half-period records of every instructor block on a sheet.
pub fn parse_sheet<G: CellGrid>(grid: &G) -> Vec<Lesson> {
    instructor_rows(grid)
        .into_iter()
        .flat_map(|row| match parse_block(grid, row) {
            Ok(records) => records,
            Err(e) => {
                log::debug!("Skipping instructor block at row {}: {}", row, e);
                Vec::new()
            }
        })
        .collect()
}

fn instructor_rows<G: CellGrid>(grid: &G) -> Vec<usize> {
    (0..grid.row_count())
        .filter(|&row| grid.cell(row, 0).trim().starts_with(INSTRUCTOR_LABEL))
        .collect()
}

fn parse_block<G: CellGrid>(grid: &G, instructor_row: usize) -> Result<Vec<Lesson>, CellError> {
    let instructor = extract_instructor(&grid.cell(instructor_row, 0));
    let columns = day_columns(grid, instructor_row)?;
    let year = block_year(grid, instructor_row)?;

    let mut records = Vec::new();
    for column in columns {
        let date_cell = grid.cell(instructor_row + DATE_OFFSET, column);
        let date = match parse_day_date(&date_cell, &year) {
            Ok(date) => date,
            Err(e) => {
                log::debug!("Skipping day column {} at row {}: {}", column, instructor_row, e);
                continue;
            }
        };

        for row in (instructor_row + LESSONS_OFFSET)..grid.row_count() {
            let Some(number) = parse_period_number(&grid.cell(row, PERIOD_COLUMN)) else {
                break;
            };

            match parse_period(grid, row, column, date, number, &instructor) {
                Ok(lessons) => records.extend(lessons),
                Err(e) => log::trace!("Row {} col {}: {}", row, column, e),
            }
        }
    }

    Ok(records)
}

fn parse_period<G: CellGrid>(
    grid: &G,
    row: usize,
    column: usize,
    date: NaiveDate,
    number: u32,
    instructor: &str,
) -> Result<Vec<Lesson>, CellError> {
    let details = grid.cell(row, column + 1);
    let discipline = normalize_discipline(&details)?;
    let room = extract_room(&details)?;
    let group = extract_group(&details);
    let names = split_student_cell(&grid.cell(row, column))?;
    let (start, end) = period_clock(number);

    let mut lessons = Vec::with_capacity(names.len());
    for (position, name) in names.into_iter().enumerate() {
        let Some(half) = PairHalf::from_position(position) else {
            log::debug!("Ignoring extra student '{}' on {} period {}", name, date, number);
            continue;
        };
        // An empty name marks an unoccupied half
        if name.is_empty() {
            continue;
        }

        let lesson = Lesson {
            time: LessonTime::new(
                date,
                number,
                half,
                HALF_LESSON_HOURS,
                date.and_time(start),
                date.and_time(end),
            ),
            discipline: discipline.clone(),
            instructor: instructor.to_string(),
            room: room.clone(),
            group: group.clone(),
            student: name,
        };
        lessons.push(bind_to_student(lesson));
    }

    Ok(lessons)
}

/// Individual lessons carry no group.
fn bind_to_student(mut lesson: Lesson) -> Lesson {
    if lesson.is_individual() {
        lesson.group.clear();
    }
    lesson
}

// ============================================================================
// Cell extraction
// ============================================================================

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"Фамилия И.О."` from an instructor label cell, or [`UNKNOWN_INSTRUCTOR`].
pub fn extract_instructor(cell: &str) -> String {
    INSTRUCTOR_RE
        .captures(cell.trim())
        .map(|caps| format!("{} {}", &caps[1], &caps[2]))
        .unwrap_or_else(|| UNKNOWN_INSTRUCTOR.to_string())
}

fn day_columns<G: CellGrid>(grid: &G, instructor_row: usize) -> Result<Vec<usize>, CellError> {
    let header_row = instructor_row + DAY_HEADER_OFFSET;
    let columns: Vec<usize> = (FIRST_DAY_COLUMN..DAY_COLUMN_LIMIT)
        .step_by(DAY_COLUMN_STRIDE)
        .take_while(|&col| !grid.cell(header_row, col).is_empty())
        .collect();

    if columns.is_empty() {
        return Err(CellError::NoDayColumns(instructor_row));
    }
    Ok(columns)
}

fn block_year<G: CellGrid>(grid: &G, instructor_row: usize) -> Result<String, CellError> {
    let cell = grid.cell(instructor_row + YEAR_OFFSET, YEAR_COLUMN);
    if cell.is_empty() {
        return Err(CellError::Empty("period"));
    }
    let year = YEAR_RE.captures(&cell).map(|caps| caps[1].to_string());
    year.ok_or(CellError::MissingYear(cell))
}

/// Date of a day column from its `"Дата: dd.mm."` cell and the block's year.
pub fn parse_day_date(cell: &str, year: &str) -> Result<NaiveDate, CellError> {
    if cell.is_empty() {
        return Err(CellError::Empty("date"));
    }

    let day_month = cell.trim();
    let day_month = day_month.strip_prefix("Дата:").unwrap_or(day_month).trim();
    let day_month = day_month.strip_suffix('.').unwrap_or(day_month);
    let full = format!("{}.{}", day_month, year);

    NaiveDate::parse_from_str(&full, "%d.%m.%Y").map_err(|_| CellError::BadDate(full))
}

/// Period number of a lesson row; `None` ends the day's list.
fn parse_period_number(cell: &str) -> Option<u32> {
    cell.trim().parse::<u32>().ok().filter(|&n| n > 0)
}

/// Canonical discipline name from a discipline cell.
///
/// Parenthesized parts (the room) and group codes are removed before the
/// alias table is consulted.
pub fn normalize_discipline(cell: &str) -> Result<String, CellError> {
    if cell.is_empty() {
        return Err(CellError::Empty("discipline"));
    }

    let collapsed = collapse_whitespace(cell);
    let without_room = PARENTHESIZED_RE.replace_all(&collapsed, "");
    let clean = GROUP_STRIP_RE.replace_all(&without_room, "").trim().to_string();

    if IGNORED_DISCIPLINES.contains(&clean.as_str()) {
        return Err(CellError::IgnoredDiscipline(clean));
    }

    Ok(DISCIPLINE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == clean)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(clean))
}

/// Room code from the first parenthesized 2-3 digit number of a discipline cell.
pub fn extract_room(cell: &str) -> Result<String, CellError> {
    if cell.is_empty() {
        return Err(CellError::Empty("room"));
    }

    let collapsed = collapse_whitespace(cell);
    let room = ROOM_RE
        .captures(&collapsed)
        .map(|caps| format!("{}{}", ROOM_PREFIX, &caps[1]));
    room.ok_or(CellError::MissingRoom(collapsed))
}

/// Group code mentioned in a discipline cell, or an empty string.
pub fn extract_group(cell: &str) -> String {
    GROUP_RE
        .captures(&collapse_whitespace(cell))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Student names of a period cell, one per half.
///
/// A cell without `/` names one student attending both halves, so the
/// name is returned twice.
pub fn split_student_cell(cell: &str) -> Result<Vec<String>, CellError> {
    let collapsed = collapse_whitespace(cell);
    if collapsed.is_empty() {
        return Err(CellError::Empty("student"));
    }

    if collapsed.contains('/') {
        Ok(collapsed.split('/').map(|name| name.trim().to_string()).collect())
    } else {
        Ok(vec![collapsed.clone(), collapsed])
    }
}

/// Start and end of a period; midnight for numbers outside the bell schedule.
pub fn period_clock(number: u32) -> (NaiveTime, NaiveTime) {
    PERIOD_CLOCK
        .iter()
        .find(|(n, _, _)| *n == number)
        .and_then(|(_, (sh, sm), (eh, em))| {
            Some((
                NaiveTime::from_hms_opt(*sh, *sm, 0)?,
                NaiveTime::from_hms_opt(*eh, *em, 0)?,
            ))
        })
        .unwrap_or((NaiveTime::MIN, NaiveTime::MIN))
}

// ============================================================================
// Post-processing
// ============================================================================

type SlotKey = (NaiveDate, u32, PairHalf, String, String, String, String);

/// Fold records of the same slot listed under several instructor blocks.
///
/// Records agreeing on date, period, half, discipline, room, group and
/// student become one record whose instructor is the sorted set of distinct
/// non-empty instructor names joined with `"& "`.
pub fn merge_instructors(records: Vec<Lesson>) -> Vec<Lesson> {
    let mut slots: BTreeMap<SlotKey, Vec<Lesson>> = BTreeMap::new();
    for lesson in records {
        let key = (
            lesson.time.date,
            lesson.time.number,
            lesson.time.half,
            lesson.discipline.clone(),
            lesson.room.clone(),
            lesson.group.clone(),
            lesson.student.clone(),
        );
        slots.entry(key).or_default().push(lesson);
    }

    slots
        .into_values()
        .filter_map(|slot| {
            let instructors: BTreeSet<&str> = slot
                .iter()
                .map(|lesson| lesson.instructor.as_str())
                .filter(|name| !name.is_empty())
                .collect();
            let joined = instructors.into_iter().collect::<Vec<_>>().join("& ");

            let multiple = slot.len() > 1;
            let mut merged = slot.into_iter().next()?;
            if multiple {
                merged.instructor = joined;
            }
            Some(merged)
        })
        .collect()
}

#[derive(Default)]
struct PeriodHalves {
    first: Option<Lesson>,
    second: Option<Lesson>,
    full: Vec<Lesson>,
}

/// Rejoin the half-period records of each (student, date, period).
///
/// Both halves present → one full-period record of two hours. A lone half is
/// kept with a `/` marking the missing side: trailing for a first half,
/// leading for a second half.
pub fn rejoin_halves(records: Vec<Lesson>) -> Vec<Lesson> {
    let mut periods: BTreeMap<(String, NaiveDate, u32), PeriodHalves> = BTreeMap::new();
    for lesson in records {
        let key = (lesson.student.clone(), lesson.time.date, lesson.time.number);
        let halves = periods.entry(key).or_default();
        match lesson.time.half {
            PairHalf::First => halves.first = Some(lesson),
            PairHalf::Second => halves.second = Some(lesson),
            PairHalf::Full => halves.full.push(lesson),
        }
    }

    let mut result = Vec::with_capacity(periods.len());
    for halves in periods.into_values() {
        match (halves.first, halves.second) {
            (Some(first), Some(second)) => result.push(join_halves(first, second)),
            (Some(mut first), None) => {
                first.discipline.push('/');
                first.instructor.push('/');
                first.room.push('/');
                result.push(first);
            }
            (None, Some(mut second)) => {
                second.discipline.insert(0, '/');
                second.instructor.insert(0, '/');
                second.room.insert(0, '/');
                result.push(second);
            }
            (None, None) => {}
        }
        result.extend(halves.full);
    }

    result
}

fn join_halves(first: Lesson, second: Lesson) -> Lesson {
    let mut joined = first;
    joined.time.half = PairHalf::Full;
    joined.time.hours = FULL_LESSON_HOURS;
    joined.time.end = second.time.end;
    joined.discipline = join_distinct(&joined.discipline, &second.discipline);
    joined.instructor = join_distinct(&joined.instructor, &second.instructor);
    joined.room = join_distinct(&joined.room, &second.room);
    joined
}

fn join_distinct(first: &str, second: &str) -> String {
    if first == second {
        first.to_string()
    } else {
        format!("{}/{}", first, second)
    }
}

#[cfg(test)]
#[path = "individual_tests.rs"]
mod tests;
