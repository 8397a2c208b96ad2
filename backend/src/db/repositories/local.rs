//! In-memory roster repository.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    find_student, insert_student, remove_student, replace_student, RepositoryResult,
    StudentRepository,
};
use crate::models::Student;

/// Roster kept in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct LocalRepository {
    students: RwLock<Vec<Student>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with `students`.
    pub fn with_students(students: Vec<Student>) -> Self {
        Self {
            students: RwLock::new(students),
        }
    }
}

#[async_trait]
impl StudentRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn load_all(&self) -> RepositoryResult<Vec<Student>> {
        Ok(self.students.read().clone())
    }

    async fn add(&self, student: Student) -> RepositoryResult<()> {
        insert_student(&mut self.students.write(), student)
    }

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Student> {
        find_student(&self.students.read(), name)
    }

    async fn update(&self, name: &str, student: Student) -> RepositoryResult<()> {
        replace_student(&mut self.students.write(), name, student)
    }

    async fn delete(&self, name: &str) -> RepositoryResult<()> {
        remove_student(&mut self.students.write(), name)
    }
}
