//! Repository factory for dependency injection.
//!
//! Creates the roster repository selected by configuration. The
//! `REPOSITORY_TYPE` environment variable, when set to a known type, takes
//! precedence over the configuration file.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repositories::{LocalRepository, TomlFileRepository};
use super::repository::{RepositoryResult, StudentRepository};
use crate::config::AppConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Roster persisted in a TOML file
    File,
    /// In-memory roster
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("file", "toml", "local")
    ///
    /// # Returns
    /// * `Ok(RepositoryType)` if valid
    /// * `Err` if invalid
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "toml" => Ok(Self::File),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. `None` when unset or not a known type.
    pub fn from_env() -> Option<Self> {
        let value = std::env::var("REPOSITORY_TYPE").ok()?;
        match value.parse() {
            Ok(repo_type) => Some(repo_type),
            Err(e) => {
                log::warn!("Ignoring REPOSITORY_TYPE: {}", e);
                None
            }
        }
    }
}

/// Repository factory for creating roster repository instances.
///
/// # Example
/// ```ignore
/// use lesson_audit::db::{RepositoryFactory, RepositoryType};
///
/// let roster = RepositoryFactory::create(RepositoryType::File, Some("students.toml".as_ref()))?;
/// let students = roster.load_all().await?;
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `students_file` - Roster file (required for File)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn StudentRepository>)` - Shared repository instance
    /// * `Err(RepositoryError)` - If the configuration is incomplete
    pub fn create(
        repo_type: RepositoryType,
        students_file: Option<&Path>,
    ) -> RepositoryResult<Arc<dyn StudentRepository>> {
        match repo_type {
            RepositoryType::File => {
                let path = students_file.ok_or_else(|| {
                    super::RepositoryError::configuration(
                        "File repository requires a students file path",
                    )
                })?;
                log::info!("Using roster file {}", path.display());
                Ok(Arc::new(TomlFileRepository::new(path)))
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create an empty in-memory repository.
    pub fn create_local() -> Arc<dyn StudentRepository> {
        log::info!("Using in-memory roster");
        Arc::new(LocalRepository::new())
    }

    /// Create the repository described by an application config.
    ///
    /// [`RepositoryType::from_env`] overrides the configured type.
    pub fn from_config(config: &AppConfig) -> RepositoryResult<Arc<dyn StudentRepository>> {
        let repo_type = match RepositoryType::from_env() {
            Some(repo_type) => repo_type,
            None => config
                .repository_type()
                .map_err(super::RepositoryError::configuration)?,
        };
        Self::create(repo_type, Some(&config.repository.students_file))
    }
}
