//! HTML report of schedule violations.
//!
//! Rendering is a pure function of `(violations, lessons)`. Each violation
//! gets a weekly grid of the student's lessons (periods 1-6 by Monday to
//! Saturday) with the cells of the offending day highlighted.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::models::{Lesson, Violation, ViolationKind};

/// Shown instead of the week bounds when there are no lessons.
pub const UNKNOWN_WEEK: &str = "Не указано";

/// Periods shown per day.
pub const GRID_PERIODS: usize = 6;

/// Days shown per week, starting on Monday.
pub const GRID_DAYS: usize = 6;

const DAY_HEADERS: [&str; GRID_DAYS] = [
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
];

const HIGHLIGHT_STYLE: &str = " style=\"background-color: #ffcccc;\"";

// ============================================================================
// Report data
// ============================================================================

/// One (period, day) cell of a student's weekly grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportCell {
    pub instructor: String,
    pub discipline: String,
    pub hours: Option<u32>,
    /// The cell lies on the violation's date
    pub highlighted: bool,
}

/// A violation with the student's weekly grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub student_name: String,
    pub group: String,
    pub year: u32,
    pub kind: ViolationKind,
    pub hours: u32,
    /// `grid[period - 1][weekday]`
    pub grid: Vec<Vec<ReportCell>>,
}

/// Everything the report shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    pub week_start: String,
    pub week_end: String,
    pub sections: Vec<ReportSection>,
}

/// Lessons sharing a grid cell identity; the first one supplies the hours.
type CellKey<'a> = (&'a str, &'a str, NaiveDate, u32, &'a str, &'a str);

/// Build the report model.
///
/// The week bounds come from the first lesson. Grid cells are filled from
/// the student's individual lessons and their group's lessons.
pub fn prepare_report(violations: &[Violation], lessons: &[Lesson]) -> ReportData {
    let (week_start, week_end) = lessons
        .first()
        .map(|l| (l.time.week_start_string(), l.time.week_end_string()))
        .unwrap_or_else(|| (UNKNOWN_WEEK.to_string(), UNKNOWN_WEEK.to_string()));

    let mut cells: BTreeMap<CellKey<'_>, Vec<&Lesson>> = BTreeMap::new();
    for lesson in lessons {
        let key = (
            lesson.student.as_str(),
            lesson.group.as_str(),
            lesson.time.date,
            lesson.time.number,
            lesson.discipline.as_str(),
            lesson.instructor.as_str(),
        );
        cells.entry(key).or_default().push(lesson);
    }

    let sections = violations
        .iter()
        .map(|violation| {
            let mut grid = vec![vec![ReportCell::default(); GRID_DAYS]; GRID_PERIODS];

            for (&(student, group, date, number, discipline, instructor), same) in &cells {
                let belongs = if student.is_empty() {
                    group == violation.group
                } else {
                    student == violation.student_name
                };
                if !belongs {
                    continue;
                }

                let day = date.weekday().num_days_from_monday() as usize;
                let Some(period) = (number as usize).checked_sub(1) else {
                    continue;
                };
                if period >= GRID_PERIODS || day >= GRID_DAYS {
                    continue;
                }

                grid[period][day] = ReportCell {
                    instructor: instructor.to_string(),
                    discipline: discipline.to_string(),
                    hours: same.first().map(|l| l.time.hours),
                    highlighted: date == violation.date,
                };
            }

            ReportSection {
                student_name: violation.student_name.clone(),
                group: violation.group.clone(),
                year: violation.year,
                kind: violation.kind,
                hours: violation.hours,
                grid,
            }
        })
        .collect();

    ReportData {
        week_start,
        week_end,
        sections,
    }
}

/// Render the HTML report fragment.
pub fn render(violations: &[Violation], lessons: &[Lesson]) -> String {
    prepare_report(violations, lessons).to_string()
}

// ============================================================================
// HTML
// ============================================================================

/// HTML-escaped text.
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

impl fmt::Display for ReportData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "<div style=\"text-align: center; margin-bottom: 20px;\"><p>Период: с {} по {}</p></div>",
            Escaped(&self.week_start),
            Escaped(&self.week_end)
        )?;

        if self.sections.is_empty() {
            return writeln!(
                f,
                "<p style=\"text-align: center; font-size: 18px;\">✅<br>Отлично!<br>Нарушений в расписании не найдено.</p>"
            );
        }

        for section in &self.sections {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "<h2>Студент: {} (Группа: {}, Курс: {})</h2>",
            Escaped(&self.student_name),
            Escaped(&self.group),
            self.year
        )?;
        writeln!(
            f,
            "<p><strong>Нарушение:</strong> {} ({} ак.ч)</p>",
            self.kind, self.hours
        )?;

        writeln!(f, "<table class=\"schedule-table\">")?;
        write!(f, "<tr><th>№</th>")?;
        for day in DAY_HEADERS {
            write!(f, "<th colspan=\"3\">{}</th>", day)?;
        }
        writeln!(f, "</tr>")?;
        write!(f, "<tr><th></th>")?;
        for _ in DAY_HEADERS {
            write!(f, "<th>Преподаватель</th><th>Дисциплина</th><th>Часы</th>")?;
        }
        writeln!(f, "</tr>")?;

        for (index, row) in self.grid.iter().enumerate() {
            write!(f, "<tr><td>{}</td>", index + 1)?;
            for cell in row {
                let style = if cell.highlighted { HIGHLIGHT_STYLE } else { "" };
                let hours = cell.hours.map(|h| h.to_string()).unwrap_or_default();
                write!(
                    f,
                    "<td{style}>{}</td><td{style}>{}</td><td{style}>{}</td>",
                    Escaped(or_dash(&cell.instructor)),
                    Escaped(or_dash(&cell.discipline)),
                    or_dash(&hours),
                )?;
            }
            writeln!(f, "</tr>")?;
        }

        writeln!(f, "</table>")
    }
}

/// Full index page around an optional rendered report.
///
/// # Arguments
/// * `report` - Report fragment from [`render`], if a check has finished
/// * `is_processing` - Whether a check is running right now
pub fn render_index_page(report: Option<&str>, is_processing: bool) -> String {
    let body = match (report, is_processing) {
        (_, true) => "<p id=\"status\">Идёт проверка расписания...</p>".to_string(),
        (Some(report), false) => format!("<div id=\"report\">{}</div>", report),
        (None, false) => "<p id=\"status\">Выберите неделю и запустите проверку.</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
<meta charset="utf-8">
<title>Проверка расписания</title>
<style>
.schedule-table {{ border-collapse: collapse; margin: 0 auto 30px; font-size: 12px; }}
.schedule-table th, .schedule-table td {{ border: 1px solid #999; padding: 4px; }}
</style>
</head>
<body>
<h1>Проверка расписания</h1>
<form id="check-form">
<input type="date" id="week-start" name="weekStart">
<button type="submit">Проверить</button>
</form>
{body}
<script>
document.getElementById('check-form').addEventListener('submit', async (e) => {{
  e.preventDefault();
  const weekStart = document.getElementById('week-start').value;
  const res = await fetch('/check', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify({{ weekStart }})
  }});
  if (res.ok) {{ setTimeout(() => location.reload(), 2000); }}
}});
</script>
</body>
</html>
"#
    )
}
