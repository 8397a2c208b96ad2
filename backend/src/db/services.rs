//! Roster service layer.
//!
//! High-level roster operations used by the HTTP handlers and the check
//! runner. Validation happens here so every repository implementation gets
//! the same rules.

use super::repository::{ErrorContext, RepositoryError, RepositoryResult, StudentRepository};
use crate::models::Student;

/// Check that a student record can be stored.
///
/// Name, group and department must be non-blank and the year must be at
/// least 1. Surrounding whitespace is trimmed.
pub fn validate_student(student: Student) -> RepositoryResult<Student> {
    let student = Student {
        name: student.name.trim().to_string(),
        group: student.group.trim().to_string(),
        department: student.department.trim().to_string(),
        year: student.year,
    };

    let blank = [
        ("name", &student.name),
        ("group", &student.group),
        ("department", &student.department),
    ]
    .into_iter()
    .find(|(_, value)| value.is_empty());

    if let Some((field, _)) = blank {
        return Err(RepositoryError::validation_with_context(
            format!("Student {} must not be empty", field),
            ErrorContext::new("validate_student").with_entity("student"),
        ));
    }

    if student.year < 1 {
        return Err(RepositoryError::validation_with_context(
            "Student year must be at least 1",
            ErrorContext::new("validate_student")
                .with_entity("student")
                .with_entity_id(&student.name),
        ));
    }

    Ok(student)
}

/// Students ordered for display: by year, then case-insensitive name.
pub async fn list_students(repo: &dyn StudentRepository) -> RepositoryResult<Vec<Student>> {
    let mut students = repo.load_all().await?;
    students.sort_by(|a, b| {
        (a.year, a.name.to_lowercase()).cmp(&(b.year, b.name.to_lowercase()))
    });
    Ok(students)
}

/// Full roster in storage order, as the check pipeline consumes it.
pub async fn load_roster(repo: &dyn StudentRepository) -> RepositoryResult<Vec<Student>> {
    repo.load_all()
        .await
        .map_err(|e| e.with_operation("load_roster"))
}

/// Validate and add a student. Returns the stored record.
pub async fn add_student(
    repo: &dyn StudentRepository,
    student: Student,
) -> RepositoryResult<Student> {
    let student = validate_student(student)?;
    repo.add(student.clone()).await?;
    log::info!("Added student '{}' ({})", student.name, student.group);
    Ok(student)
}

pub async fn get_student(repo: &dyn StudentRepository, name: &str) -> RepositoryResult<Student> {
    repo.get_by_name(name).await
}

/// Validate and replace the student stored under `name`.
pub async fn update_student(
    repo: &dyn StudentRepository,
    name: &str,
    student: Student,
) -> RepositoryResult<Student> {
    let student = validate_student(student)?;
    repo.update(name, student.clone()).await?;
    log::info!("Updated student '{}'", name);
    Ok(student)
}

pub async fn delete_student(repo: &dyn StudentRepository, name: &str) -> RepositoryResult<()> {
    repo.delete(name).await?;
    log::info!("Deleted student '{}'", name);
    Ok(())
}

pub async fn health_check(repo: &dyn StudentRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}
