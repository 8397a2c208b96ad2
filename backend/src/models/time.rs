use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Part of a period occupied by a lesson.
///
/// Serialized as the numeric code used by both schedule sources:
/// `0` for the whole period, `1`/`2` for the first/second half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PairHalf {
    /// Both halves of the period.
    Full,
    /// First half only.
    First,
    /// Second half only.
    Second,
}

impl PairHalf {
    /// Half for the name at `index` inside a split student cell.
    pub fn from_position(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            _ => None,
        }
    }

    /// Numeric code of the half (0, 1 or 2).
    pub fn code(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl From<PairHalf> for u8 {
    fn from(half: PairHalf) -> Self {
        half.code()
    }
}

impl TryFrom<u8> for PairHalf {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Full),
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(format!("invalid pair half: {}", other)),
        }
    }
}

/// Calendar placement of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonTime {
    /// Date of the lesson
    pub date: NaiveDate,
    /// Period number, 1-based
    pub number: u32,
    /// Occupied part of the period
    pub half: PairHalf,
    /// Duration in academic hours
    pub hours: u32,
    /// Wall-clock start on `date`
    pub start: NaiveDateTime,
    /// Wall-clock end on `date`
    pub end: NaiveDateTime,
}

impl LessonTime {
    pub fn new(
        date: NaiveDate,
        number: u32,
        half: PairHalf,
        hours: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            date,
            number,
            half,
            hours,
            start,
            end,
        }
    }

    /// Date in `YYYY-MM-DD` form.
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Russian name of the weekday, lowercase.
    pub fn day_name(&self) -> &'static str {
        day_name(self.date.weekday())
    }

    /// Start time in `HH:MM` form.
    pub fn start_time_string(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    /// End time in `HH:MM` form.
    pub fn end_time_string(&self) -> String {
        self.end.format("%H:%M").to_string()
    }

    /// Monday of the lesson's week.
    pub fn week_start(&self) -> NaiveDate {
        let offset = self.date.weekday().num_days_from_monday();
        self.date - Duration::days(i64::from(offset))
    }

    /// Sunday of the lesson's week.
    pub fn week_end(&self) -> NaiveDate {
        self.week_start() + Duration::days(6)
    }

    pub fn week_start_string(&self) -> String {
        self.week_start().format("%Y-%m-%d").to_string()
    }

    pub fn week_end_string(&self) -> String {
        self.week_end().format("%Y-%m-%d").to_string()
    }

    /// Half-period slots occupied on the lesson's day.
    ///
    /// Slot `(number - 1) * 2` is the first half of the period and the next
    /// slot is the second half; a full period occupies both.
    pub fn occupied_slots(&self) -> Vec<u32> {
        let first = self.number.saturating_sub(1) * 2;
        match self.half {
            PairHalf::Full => vec![first, first + 1],
            PairHalf::First => vec![first],
            PairHalf::Second => vec![first + 1],
        }
    }
}

/// Russian weekday name as used in the report grid.
pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "понедельник",
        Weekday::Tue => "вторник",
        Weekday::Wed => "среда",
        Weekday::Thu => "четверг",
        Weekday::Fri => "пятница",
        Weekday::Sat => "суббота",
        Weekday::Sun => "воскресенье",
    }
}
