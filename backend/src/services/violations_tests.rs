use super::*;
use crate::models::{LessonTime, PairHalf};
use chrono::NaiveTime;
use proptest::prelude::*;

const GROUP: &str = "МД-21-о";

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, n).unwrap()
}

fn lesson_on(date: NaiveDate, number: u32, half: PairHalf, hours: u32) -> Lesson {
    let at = date.and_time(NaiveTime::MIN);
    Lesson {
        time: LessonTime::new(date, number, half, hours, at, at),
        discipline: "Сольфеджио".to_string(),
        instructor: "Петров А.А.".to_string(),
        room: "К3-101".to_string(),
        group: GROUP.to_string(),
        student: String::new(),
    }
}

fn group_lesson(number: u32) -> Lesson {
    lesson_on(day(10), number, PairHalf::Full, 2)
}

fn individual(student: &str, number: u32, half: PairHalf) -> Lesson {
    let mut lesson = lesson_on(day(10), number, half, 1);
    lesson.group = String::new();
    lesson.student = student.to_string();
    lesson
}

fn ivanov(year: u32) -> Student {
    Student::new("Иванов И.И.", GROUP, "Музыкальный", year)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_load_exceeded_scenario() {
    let lessons: Vec<Lesson> = (1..=6).map(group_lesson).collect();
    let violations = detect_violations(&[ivanov(2)], &lessons);

    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.kind, ViolationKind::LoadExceeded);
    assert_eq!(v.kind.label(), "Превышение нагрузки");
    assert_eq!(v.hours, 12);
    assert_eq!(v.student_name, "Иванов И.И.");
    assert_eq!(v.group, GROUP);
    assert_eq!(v.year, 2);
    assert_eq!(v.date, day(10));
}

#[test]
fn test_gaps_exceeded_scenario_first_year() {
    let lessons = vec![group_lesson(1), group_lesson(4)];
    let violations = detect_violations(&[ivanov(1)], &lessons);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::GapsExceeded);
    assert_eq!(violations[0].kind.label(), "Превышение окон");
    assert_eq!(violations[0].hours, 4);
}

#[test]
fn test_same_gaps_allowed_from_second_year() {
    let lessons = vec![group_lesson(1), group_lesson(4)];
    assert!(detect_violations(&[ivanov(2)], &lessons).is_empty());
}

#[test]
fn test_load_boundary_does_not_trigger() {
    let lessons: Vec<Lesson> = (1..=5).map(group_lesson).collect();
    assert_eq!(daily_load(&lessons), 10);
    assert!(detect_violations(&[ivanov(2)], &lessons).is_empty());
}

#[test]
fn test_gap_boundaries_do_not_trigger() {
    // Periods 1 and 3: two empty half-periods
    let two = vec![group_lesson(1), group_lesson(3)];
    assert_eq!(count_gaps(&two), 2);
    assert!(detect_violations(&[ivanov(1)], &two).is_empty());

    // Periods 1 and 4 for a senior student: four empty half-periods
    let four = vec![group_lesson(1), group_lesson(4)];
    assert_eq!(count_gaps(&four), 4);
    assert!(detect_violations(&[ivanov(3)], &four).is_empty());

    // Periods 1 and 5: six
    let six = vec![group_lesson(1), group_lesson(5)];
    let violations = detect_violations(&[ivanov(3)], &six);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].hours, 6);
}

#[test]
fn test_both_rules_on_one_day() {
    let lessons: Vec<Lesson> = [1, 2, 3, 6]
        .into_iter()
        .map(|number| lesson_on(day(10), number, PairHalf::Full, 3))
        .collect();
    let violations = detect_violations(&[ivanov(1)], &lessons);

    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].kind, ViolationKind::LoadExceeded);
    assert_eq!(violations[0].hours, 12);
    assert_eq!(violations[1].kind, ViolationKind::GapsExceeded);
    assert_eq!(violations[1].hours, 4);
}

// ============================================================================
// Schedule assembly
// ============================================================================

#[test]
fn test_individual_lessons_bind_by_name() {
    let student = ivanov(1);
    let lessons = vec![
        individual("Иванов И.И.", 1, PairHalf::First),
        individual("Сидоров С.С.", 2, PairHalf::Full),
        group_lesson(3),
        {
            let mut other = group_lesson(4);
            other.group = "МД-22-о".to_string();
            other
        },
    ];

    let detector = ViolationDetector::new(&lessons);
    let days = detector.schedule_by_date(&student);
    assert_eq!(days.len(), 1);
    assert_eq!(days[&day(10)].len(), 2);
}

#[test]
fn test_half_period_slots() {
    // First half of period 1 and second half of period 2: slots 0 and 3
    let lessons = vec![
        individual("Иванов И.И.", 1, PairHalf::First),
        individual("Иванов И.И.", 2, PairHalf::Second),
    ];
    assert_eq!(count_gaps(&lessons), 2);
    assert_eq!(daily_load(&lessons), 2);
}

#[test]
fn test_days_are_checked_separately() {
    let lessons = vec![
        lesson_on(day(10), 1, PairHalf::Full, 2),
        lesson_on(day(11), 7, PairHalf::Full, 2),
    ];
    assert!(detect_violations(&[ivanov(1)], &lessons).is_empty());
}

#[test]
fn test_empty_inputs() {
    assert!(detect_violations(&[], &[group_lesson(1)]).is_empty());
    assert!(detect_violations(&[ivanov(1)], &[]).is_empty());
    assert_eq!(count_gaps(&Vec::<Lesson>::new()), 0);
}

#[test]
fn test_violations_are_sorted() {
    let students = vec![
        Student::new("Сидоров С.С.", GROUP, "Музыкальный", 1),
        ivanov(1),
    ];
    let mut lessons = Vec::new();
    for date in [day(12), day(10)] {
        for number in [1, 2, 3, 4, 5, 7] {
            lessons.push(lesson_on(date, number, PairHalf::Full, 2));
        }
    }

    let violations = detect_violations(&students, &lessons);
    assert_eq!(violations.len(), 4);
    let order: Vec<(&str, NaiveDate)> = violations
        .iter()
        .map(|v| (v.student_name.as_str(), v.date))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Иванов И.И.", day(10)),
            ("Иванов И.И.", day(12)),
            ("Сидоров С.С.", day(10)),
            ("Сидоров С.С.", day(12)),
        ]
    );
    assert!(violations.iter().all(|v| v.kind == ViolationKind::LoadExceeded));
}

#[test]
fn test_max_gaps_for_year() {
    assert_eq!(max_gaps_for_year(1), 2);
    assert_eq!(max_gaps_for_year(2), 4);
    assert_eq!(max_gaps_for_year(5), 4);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_load_rule_fires_iff_above_limit(hours in prop::collection::vec(1u32..=2, 0..8)) {
        let lessons: Vec<Lesson> = hours
            .iter()
            .enumerate()
            .map(|(i, &h)| lesson_on(day(10), i as u32 + 1, PairHalf::Full, h))
            .collect();
        let total: u32 = hours.iter().sum();

        let violations = detect_violations(&[ivanov(2)], &lessons);
        let load_violations: Vec<_> = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::LoadExceeded)
            .collect();

        prop_assert_eq!(load_violations.len(), usize::from(total > MAX_DAILY_LOAD_HOURS));
        if let Some(v) = load_violations.first() {
            prop_assert_eq!(v.hours, total);
        }
    }

    #[test]
    fn prop_gap_rule_threshold(year in 1u32..=5, last in 2u32..=7) {
        let lessons = vec![group_lesson(1), group_lesson(last)];
        let gaps = 2 * last - 4;
        prop_assert_eq!(count_gaps(&lessons), gaps);

        let violations = detect_violations(&[ivanov(year)], &lessons);
        let fired = violations.iter().any(|v| v.kind == ViolationKind::GapsExceeded);
        prop_assert_eq!(fired, gaps > max_gaps_for_year(year));
    }

    #[test]
    fn prop_full_period_occupies_both_slots(number in 1u32..=7) {
        let slots = group_lesson(number).time.occupied_slots();
        prop_assert_eq!(slots, vec![(number - 1) * 2, (number - 1) * 2 + 1]);
    }

    #[test]
    fn prop_gaps_never_exceed_span(
        slots in prop::collection::btree_set((1u32..=7, 0u8..=2), 1..10)
    ) {
        let lessons: Vec<Lesson> = slots
            .iter()
            .map(|&(number, half)| {
                let half = PairHalf::try_from(half).unwrap();
                lesson_on(day(10), number, half, 1)
            })
            .collect();
        prop_assert!(count_gaps(&lessons) <= 12);
    }
}
