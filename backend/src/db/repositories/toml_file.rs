//! Roster persisted as a TOML file.
//!
//! File layout:
//!
//! ```toml
//! [[students]]
//! name = "Иванов И.И."
//! group = "МД-21-о"
//! department = "Музыкальный"
//! year = 2
//! ```
//!
//! Every operation re-reads the file so hand edits made while the server runs
//! are picked up. Writes are serialized by an async `RwLock`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::db::repository::{
    find_student, insert_student, remove_student, replace_student, ErrorContext, RepositoryError,
    RepositoryResult, StudentRepository,
};
use crate::models::Student;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RosterFile {
    #[serde(default)]
    students: Vec<Student>,
}

/// Roster stored in a flat TOML file.
pub struct TomlFileRepository {
    path: PathBuf,
    lock: RwLock<()>,
}

impl TomlFileRepository {
    /// Repository backed by `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new(operation)
            .with_entity("roster")
            .with_details(self.path.display().to_string())
    }

    /// Read the roster. A missing file is an empty roster.
    async fn read_roster(&self, operation: &str) -> RepositoryResult<Vec<Student>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RepositoryError::storage_with_context(
                    format!("Failed to read roster: {}", e),
                    self.context(operation),
                ))
            }
        };

        let file: RosterFile = toml::from_str(&text).map_err(|e| {
            RepositoryError::serialization_with_context(
                format!("Failed to parse roster: {}", e),
                self.context(operation),
            )
        })?;
        Ok(file.students)
    }

    async fn write_roster(&self, operation: &str, students: Vec<Student>) -> RepositoryResult<()> {
        let text = toml::to_string(&RosterFile { students }).map_err(|e| {
            RepositoryError::serialization_with_context(
                format!("Failed to encode roster: {}", e),
                self.context(operation),
            )
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RepositoryError::storage_with_context(
                    format!("Failed to create roster directory: {}", e),
                    self.context(operation),
                )
            })?;
        }

        tokio::fs::write(&self.path, text).await.map_err(|e| {
            RepositoryError::storage_with_context(
                format!("Failed to write roster: {}", e),
                self.context(operation),
            )
        })
    }

    /// Read, mutate and write back the roster under the write lock.
    async fn modify<F>(&self, operation: &str, mutate: F) -> RepositoryResult<()>
    where
        F: FnOnce(&mut Vec<Student>) -> RepositoryResult<()> + Send,
    {
        let _guard = self.lock.write().await;
        let mut students = self.read_roster(operation).await?;
        mutate(&mut students)?;
        self.write_roster(operation, students).await?;
        log::debug!("Roster {} saved after {}", self.path.display(), operation);
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for TomlFileRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let _guard = self.lock.read().await;
        self.read_roster("health_check").await.map(|_| true)
    }

    async fn load_all(&self) -> RepositoryResult<Vec<Student>> {
        let _guard = self.lock.read().await;
        self.read_roster("load_all").await
    }

    async fn add(&self, student: Student) -> RepositoryResult<()> {
        self.modify("add", move |roster| insert_student(roster, student))
            .await
    }

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Student> {
        let _guard = self.lock.read().await;
        let students = self.read_roster("get_by_name").await?;
        find_student(&students, name)
    }

    async fn update(&self, name: &str, student: Student) -> RepositoryResult<()> {
        self.modify("update", move |roster| replace_student(roster, name, student))
            .await
    }

    async fn delete(&self, name: &str) -> RepositoryResult<()> {
        self.modify("delete", move |roster| remove_student(roster, name))
            .await
    }
}
