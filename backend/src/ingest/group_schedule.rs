//! Group lesson records as served by the schedule portal, and their
//! reduction to one lesson per (date, period) slot.
//!
//! A group with subgroups gets one record per subgroup in the same slot,
//! so the portal's list is merged before it enters the lesson model:
//!
//! ```text
//! (2025-03-10, 2) Вокал [пр] / подгр. 1 / Петров А.А.  / К3-101
//! (2025-03-10, 2) Вокал [пр] / подгр. 2 / Сидоров Б.Б. / К3-102
//!          ↓
//! (2025-03-10, 2) "Вокал [пр] / Вокал [пр]", "Петров А.А. & Сидоров Б.Б.", "К3-101 / К3-102"
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use super::error::FetchError;
use crate::models::{Lesson, LessonTime, PairHalf};

/// Discipline name the portal uses for the individual-lessons placeholder.
pub const INDIVIDUAL_LESSONS_PLACEHOLDER: &str = "Индивидуальные занятия";

/// Subgroup tag of a record that applies to the whole group.
pub const NO_SUBGROUP: &str = "0";

/// Academic hours of one full period.
pub const GROUP_LESSON_HOURS: u32 = 2;

const SNIPPET_CHARS: usize = 200;

/// One entry of the portal's `LessonList` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawLessonRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub week_day_num: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub week_day_date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub week_date_start: String,
    #[serde(default, deserialize_with = "nullable")]
    pub week_date_end: String,
    #[serde(default, deserialize_with = "nullable")]
    pub lesson_num: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub lesson_time_start: String,
    #[serde(default, deserialize_with = "nullable")]
    pub lesson_time_end: String,
    #[serde(default, deserialize_with = "nullable")]
    pub disc_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub disc_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub disc_subgroup: String,
    #[serde(default, deserialize_with = "nullable")]
    pub teacher_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub audit_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub group_name: String,
}

/// `null` reads as the type's zero value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawLessonRecord {
    /// Discipline name with the lesson type in brackets, when present.
    pub fn discipline_label(&self) -> String {
        if self.disc_type.is_empty() {
            self.disc_name.clone()
        } else {
            format!("{} [{}]", self.disc_name, self.disc_type)
        }
    }
}

#[derive(Deserialize)]
struct LessonListEnvelope {
    #[serde(rename = "LessonList", default)]
    lesson_list: Option<LessonListBody>,
}

/// The portal serializes an empty list as `[]` rather than `{}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LessonListBody {
    Keyed(BTreeMap<String, RawLessonRecord>),
    Listed(Vec<RawLessonRecord>),
}

impl Default for LessonListBody {
    fn default() -> Self {
        Self::Keyed(BTreeMap::new())
    }
}

/// Decode the lesson list response body into `(opaque key, record)` pairs.
///
/// # Errors
/// * [`FetchError::UnexpectedMarkup`] if the body is HTML
/// * [`FetchError::Decode`] if the body is not the expected JSON envelope
pub fn decode_lesson_list(body: &str) -> Result<Vec<(String, RawLessonRecord)>, FetchError> {
    if body.trim_start().starts_with('<') {
        return Err(FetchError::UnexpectedMarkup);
    }

    let envelope: LessonListEnvelope =
        serde_json::from_str(body).map_err(|source| FetchError::Decode {
            source,
            snippet: body.chars().take(SNIPPET_CHARS).collect(),
        })?;

    Ok(match envelope.lesson_list.unwrap_or_default() {
        LessonListBody::Keyed(map) => map.into_iter().collect(),
        LessonListBody::Listed(list) => list
            .into_iter()
            .enumerate()
            .map(|(index, record)| (index.to_string(), record))
            .collect(),
    })
}

/// Reduce raw records to one full-period lesson per (date, period) slot.
///
/// Placeholder records for individual lessons are dropped. A slot holding a
/// single whole-group record becomes a lesson as is; any other slot is merged
/// with [`merge_records`] after ordering its records by subgroup tag.
pub fn merge_slot_records(records: Vec<(String, RawLessonRecord)>) -> Vec<Lesson> {
    let mut slots: BTreeMap<(String, u32), Vec<(String, RawLessonRecord)>> = BTreeMap::new();
    for (key, record) in records {
        if record.disc_name == INDIVIDUAL_LESSONS_PLACEHOLDER {
            continue;
        }
        slots
            .entry((record.week_day_date.clone(), record.lesson_num))
            .or_default()
            .push((key, record));
    }

    slots
        .into_values()
        .filter_map(|mut slot| {
            slot.sort_by(|(key_a, a), (key_b, b)| {
                (a.disc_subgroup.as_str(), key_a.as_str())
                    .cmp(&(b.disc_subgroup.as_str(), key_b.as_str()))
            });
            let records: Vec<RawLessonRecord> = slot.into_iter().map(|(_, r)| r).collect();

            let record = match records.as_slice() {
                [single] if single.disc_subgroup == NO_SUBGROUP => single.clone(),
                _ => merge_records(&records)?,
            };
            to_lesson(&record)
        })
        .collect()
}

/// Merge records of one slot into a single record.
///
/// Disciplines and rooms are joined with `" / "`, instructors with `" & "`;
/// every other field comes from the first record.
pub fn merge_records(records: &[RawLessonRecord]) -> Option<RawLessonRecord> {
    let first = records.first()?;

    let mut merged = first.clone();
    merged.disc_name = records
        .iter()
        .map(RawLessonRecord::discipline_label)
        .collect::<Vec<_>>()
        .join(" / ");
    // The type is already folded into each discipline label
    merged.disc_type = String::new();
    merged.teacher_name = records
        .iter()
        .map(|r| r.teacher_name.as_str())
        .collect::<Vec<_>>()
        .join(" & ");
    merged.audit_name = records
        .iter()
        .map(|r| r.audit_name.as_str())
        .collect::<Vec<_>>()
        .join(" / ");

    Some(merged)
}

/// Convert a record into a full-period group lesson.
///
/// Returns `None` when the record's date cannot be parsed. Clock times that
/// cannot be parsed fall back to midnight.
pub fn to_lesson(record: &RawLessonRecord) -> Option<Lesson> {
    let date = match NaiveDate::parse_from_str(record.week_day_date.trim(), "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            log::warn!(
                "Skipping lesson '{}' for group {}: bad date '{}': {}",
                record.disc_name,
                record.group_name,
                record.week_day_date,
                e
            );
            return None;
        }
    };

    let start = date.and_time(parse_clock(&record.lesson_time_start));
    let end = date.and_time(parse_clock(&record.lesson_time_end));

    Some(Lesson {
        time: LessonTime::new(
            date,
            record.lesson_num,
            PairHalf::Full,
            GROUP_LESSON_HOURS,
            start,
            end,
        ),
        discipline: record.discipline_label(),
        instructor: record.teacher_name.clone(),
        room: record.audit_name.clone(),
        group: record.group_name.clone(),
        student: String::new(),
    })
}

fn parse_clock(value: &str) -> NaiveTime {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .unwrap_or_else(|_| {
            log::debug!("Unparseable lesson time '{}', using midnight", value);
            NaiveTime::MIN
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, num: u32, subgroup: &str, teacher: &str, room: &str) -> RawLessonRecord {
        RawLessonRecord {
            week_day_num: 1,
            week_day_date: date.to_string(),
            week_date_start: "2025-03-10".to_string(),
            week_date_end: "2025-03-16".to_string(),
            lesson_num: num,
            lesson_time_start: "08:30".to_string(),
            lesson_time_end: "10:00".to_string(),
            disc_name: "Сольфеджио".to_string(),
            disc_type: "пр".to_string(),
            disc_subgroup: subgroup.to_string(),
            teacher_name: teacher.to_string(),
            audit_name: room.to_string(),
            group_name: "МД-21-о".to_string(),
        }
    }

    fn keyed(records: Vec<RawLessonRecord>) -> Vec<(String, RawLessonRecord)> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, r)| (format!("k{}", i), r))
            .collect()
    }

    #[test]
    fn test_decode_keyed_lesson_list() {
        let body = r#"{"LessonList": {
            "a1": {"WEEK_DAY_NUM": 1, "WEEK_DAY_DATE": "2025-03-10", "LESSON_NUM": 2,
                   "LESSON_TIME_START": "10:10", "LESSON_TIME_END": "11:40",
                   "DISC_NAME": "Вокал", "DISC_TYPE": "", "DISC_SUBGROUP": "0",
                   "TEACHER_NAME": "Петров А.А.", "AUDIT_NAME": "К3-101", "GROUP_NAME": "МД-21-о"}
        }}"#;
        let records = decode_lesson_list(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "a1");
        assert_eq!(records[0].1.lesson_num, 2);
        assert_eq!(records[0].1.teacher_name, "Петров А.А.");
    }

    #[test]
    fn test_decode_empty_list_as_array() {
        let records = decode_lesson_list(r#"{"LessonList": []}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_decode_null_fields() {
        let body = r#"{"LessonList": {"x": {"WEEK_DAY_DATE": "2025-03-10", "LESSON_NUM": 1,
            "DISC_NAME": "Вокал", "DISC_TYPE": null, "AUDIT_NAME": null}}}"#;
        let records = decode_lesson_list(body).unwrap();
        assert_eq!(records[0].1.disc_type, "");
        assert_eq!(records[0].1.audit_name, "");
    }

    #[test]
    fn test_decode_null_lesson_list() {
        assert!(decode_lesson_list(r#"{"LessonList": null}"#).unwrap().is_empty());
        assert!(decode_lesson_list("{}").unwrap().is_empty());
    }

    #[test]
    fn test_decode_null_numbers_read_as_zero() {
        let body = r#"{"LessonList": {"x": {"WEEK_DAY_NUM": null, "WEEK_DAY_DATE": "2025-03-10",
            "LESSON_NUM": null, "DISC_NAME": "Вокал"}}}"#;
        let records = decode_lesson_list(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.week_day_num, 0);
        assert_eq!(records[0].1.lesson_num, 0);
    }

    #[test]
    fn test_decode_markup_is_session_error() {
        let err = decode_lesson_list("  <html><body>login</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedMarkup));
    }

    #[test]
    fn test_decode_garbage_keeps_snippet() {
        let body = "x".repeat(500);
        match decode_lesson_list(&body).unwrap_err() {
            FetchError::Decode { snippet, .. } => assert_eq!(snippet.len(), 200),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_single_whole_group_record_passes_through() {
        let lessons = merge_slot_records(keyed(vec![record(
            "2025-03-10",
            1,
            NO_SUBGROUP,
            "Петров А.А.",
            "К3-101",
        )]));

        assert_eq!(lessons.len(), 1);
        let lesson = &lessons[0];
        assert_eq!(lesson.time.half, PairHalf::Full);
        assert_eq!(lesson.time.hours, 2);
        assert_eq!(lesson.discipline, "Сольфеджио [пр]");
        assert_eq!(lesson.instructor, "Петров А.А.");
        assert_eq!(lesson.room, "К3-101");
        assert_eq!(lesson.group, "МД-21-о");
        assert!(lesson.student.is_empty());
        assert_eq!(lesson.time.start_time_string(), "08:30");
        assert_eq!(lesson.time.end_time_string(), "10:00");
    }

    #[test]
    fn test_subgroups_in_one_slot_are_merged() {
        let lessons = merge_slot_records(keyed(vec![
            record("2025-03-10", 2, "2", "Сидоров Б.Б.", "К3-102"),
            record("2025-03-10", 2, "1", "Петров А.А.", "К3-101"),
        ]));

        assert_eq!(lessons.len(), 1);
        let lesson = &lessons[0];
        assert_eq!(lesson.instructor, "Петров А.А. & Сидоров Б.Б.");
        assert_eq!(lesson.discipline, "Сольфеджио [пр] / Сольфеджио [пр]");
        assert_eq!(lesson.room, "К3-101 / К3-102");
        assert_eq!(lesson.time.half, PairHalf::Full);
        assert_eq!(lesson.time.hours, 2);
    }

    #[test]
    fn test_single_subgroup_record_keeps_its_fields() {
        let lessons = merge_slot_records(keyed(vec![record(
            "2025-03-10",
            3,
            "1",
            "Петров А.А.",
            "К3-101",
        )]));
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].discipline, "Сольфеджио [пр]");
        assert_eq!(lessons[0].instructor, "Петров А.А.");
    }

    #[test]
    fn test_distinct_slots_stay_separate() {
        let lessons = merge_slot_records(keyed(vec![
            record("2025-03-10", 1, NO_SUBGROUP, "Петров А.А.", "К3-101"),
            record("2025-03-10", 2, NO_SUBGROUP, "Петров А.А.", "К3-101"),
            record("2025-03-11", 1, NO_SUBGROUP, "Петров А.А.", "К3-101"),
        ]));
        assert_eq!(lessons.len(), 3);
    }

    #[test]
    fn test_placeholder_records_are_dropped() {
        let mut placeholder = record("2025-03-10", 1, NO_SUBGROUP, "", "");
        placeholder.disc_name = INDIVIDUAL_LESSONS_PLACEHOLDER.to_string();
        let lessons = merge_slot_records(keyed(vec![placeholder]));
        assert!(lessons.is_empty());
    }

    #[test]
    fn test_bad_date_skips_slot() {
        let lessons = merge_slot_records(keyed(vec![record(
            "10.03.2025",
            1,
            NO_SUBGROUP,
            "Петров А.А.",
            "К3-101",
        )]));
        assert!(lessons.is_empty());
    }

    #[test]
    fn test_discipline_label_without_type() {
        let mut r = record("2025-03-10", 1, NO_SUBGROUP, "", "");
        r.disc_type = String::new();
        assert_eq!(r.discipline_label(), "Сольфеджио");
    }
}
