//! Roster repository trait.
//!
//! The roster is a flat record store keyed by student name. The check
//! pipeline only reads it through [`StudentRepository::load_all`]; the
//! remaining operations back the roster management endpoints.

use async_trait::async_trait;

use crate::models::Student;

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Storage of the student roster.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared across request handlers.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Every student in storage order.
    async fn load_all(&self) -> RepositoryResult<Vec<Student>>;

    /// Add a student.
    ///
    /// # Returns
    /// * `Err(RepositoryError::AlreadyExists)` - If a student with the same name exists
    async fn add(&self, student: Student) -> RepositoryResult<()>;

    /// Look a student up by name.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no student has that name
    async fn get_by_name(&self, name: &str) -> RepositoryResult<Student>;

    /// Replace the student stored under `name`.
    ///
    /// The replacement may carry a different name (a rename).
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no student has that name
    /// * `Err(RepositoryError::AlreadyExists)` - If a rename collides with another student
    async fn update(&self, name: &str, student: Student) -> RepositoryResult<()>;

    /// Remove the student stored under `name`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no student has that name
    async fn delete(&self, name: &str) -> RepositoryResult<()>;
}

// ============================================================================
// Shared roster mutations
// ============================================================================

fn student_context(operation: &str, name: &str) -> ErrorContext {
    ErrorContext::new(operation)
        .with_entity("student")
        .with_entity_id(name)
}

/// Append `student` unless its name is taken.
pub(crate) fn insert_student(roster: &mut Vec<Student>, student: Student) -> RepositoryResult<()> {
    if roster.iter().any(|s| s.name == student.name) {
        return Err(RepositoryError::already_exists_with_context(
            format!("Student '{}' already exists", student.name),
            student_context("add", &student.name),
        ));
    }
    roster.push(student);
    Ok(())
}

/// Find a student by name.
pub(crate) fn find_student(roster: &[Student], name: &str) -> RepositoryResult<Student> {
    roster
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Student '{}' not found", name),
                student_context("get_by_name", name),
            )
        })
}

/// Replace the student named `name` in place.
pub(crate) fn replace_student(
    roster: &mut [Student],
    name: &str,
    student: Student,
) -> RepositoryResult<()> {
    if student.name != name && roster.iter().any(|s| s.name == student.name) {
        return Err(RepositoryError::already_exists_with_context(
            format!("Student '{}' already exists", student.name),
            student_context("update", name),
        ));
    }
    let slot = roster.iter_mut().find(|s| s.name == name).ok_or_else(|| {
        RepositoryError::not_found_with_context(
            format!("Student '{}' not found", name),
            student_context("update", name),
        )
    })?;
    *slot = student;
    Ok(())
}

/// Remove the student named `name`.
pub(crate) fn remove_student(roster: &mut Vec<Student>, name: &str) -> RepositoryResult<()> {
    let before = roster.len();
    roster.retain(|s| s.name != name);
    if roster.len() == before {
        return Err(RepositoryError::not_found_with_context(
            format!("Student '{}' not found", name),
            student_context("delete", name),
        ));
    }
    Ok(())
}
