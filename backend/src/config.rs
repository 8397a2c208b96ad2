//! Configuration file support.
//!
//! Settings are read from a TOML file. Every section and key is optional;
//! missing values fall back to the defaults below.
//!
//! ```toml
//! [repository]
//! type = "file"
//! students_file = "students.toml"
//!
//! [portal]
//! base_url = "https://sspi.ru/"
//! landing_alias = "429"
//! request_timeout_secs = 60
//!
//! [ingest]
//! input_dir = "schedules"
//! cache_ttl_minutes = 30
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::db::factory::RepositoryType;

/// Name of the configuration file looked up in the standard locations.
pub const CONFIG_FILE_NAME: &str = "lesson-audit.toml";

/// Application configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Roster storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    #[serde(default = "default_students_file")]
    pub students_file: PathBuf,
}

/// Schedule portal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_landing_alias")]
    pub landing_alias: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout; unset means requests may wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Root of the recursive spreadsheet scan; the working directory when unset
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,
}

fn default_repo_type() -> String {
    "file".to_string()
}

fn default_students_file() -> PathBuf {
    PathBuf::from("students.toml")
}

fn default_base_url() -> String {
    "https://sspi.ru/".to_string()
}

fn default_landing_alias() -> String {
    "429".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0".to_string()
}

fn default_cache_ttl_minutes() -> u64 {
    30
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            students_file: default_students_file(),
        }
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            landing_alias: default_landing_alias(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            input_dir: None,
            cache_ttl_minutes: default_cache_ttl_minutes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` if successful
    /// * `Err` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `lesson-audit.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when no file exists in any of them.
    pub fn from_default_location() -> Result<Option<Self>> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }

        Ok(None)
    }

    /// Load from `explicit` when given, else from the default location, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Ok(Self::from_default_location()?.unwrap_or_default()),
        }
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }
}

impl PortalSettings {
    fn base(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }

    /// Landing page holding the department selector.
    pub fn landing_url(&self) -> String {
        format!("{}?alias={}", self.base(), self.landing_alias)
    }

    /// Endpoint returning the group options of one department.
    pub fn search_group_url(&self) -> String {
        format!("{}plugins/AutoRasp/SearchGroup.php", self.base())
    }

    /// Endpoint returning the lesson list of one group.
    pub fn lesson_list_url(&self) -> String {
        format!("{}plugins/AutoRasp/GroupLessonList.php", self.base())
    }

    /// Scheme and host of the portal, sent as the `Origin` header.
    pub fn origin(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl IngestSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    /// Directory scanned for individual-schedule spreadsheets.
    pub fn resolve_input_dir(&self) -> std::io::Result<PathBuf> {
        match &self.input_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.repository.repo_type, "file");
        assert_eq!(config.repository.students_file, PathBuf::from("students.toml"));
        assert_eq!(config.portal.base_url, "https://sspi.ru/");
        assert_eq!(config.ingest.cache_ttl_minutes, 30);
        assert!(config.portal.request_timeout_secs.is_none());
    }

    #[test]
    fn test_parse_local_config() {
        let toml = r#"
[repository]
type = "local"
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[repository]
type = "file"
students_file = "data/roster.toml"

[portal]
base_url = "http://localhost:9000"
landing_alias = "7"
request_timeout_secs = 15

[ingest]
input_dir = "schedules"
cache_ttl_minutes = 5
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repository_type().unwrap(), RepositoryType::File);
        assert_eq!(config.repository.students_file, PathBuf::from("data/roster.toml"));
        assert_eq!(config.portal.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.ingest.cache_ttl(), Duration::from_secs(300));
        assert_eq!(
            config.ingest.resolve_input_dir().unwrap(),
            PathBuf::from("schedules")
        );
    }

    #[test]
    fn test_cache_ttl_saturates() {
        let ingest = IngestSettings {
            cache_ttl_minutes: u64::MAX,
            ..IngestSettings::default()
        };
        assert_eq!(ingest.cache_ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_portal_urls() {
        let portal = PortalSettings {
            base_url: "http://localhost:9000".to_string(),
            ..PortalSettings::default()
        };
        assert_eq!(portal.landing_url(), "http://localhost:9000/?alias=429");
        assert_eq!(
            portal.search_group_url(),
            "http://localhost:9000/plugins/AutoRasp/SearchGroup.php"
        );
        assert_eq!(
            portal.lesson_list_url(),
            "http://localhost:9000/plugins/AutoRasp/GroupLessonList.php"
        );
        assert_eq!(portal.origin(), "http://localhost:9000");
    }

    #[test]
    fn test_invalid_repository_type() {
        let toml = r#"
[repository]
type = "postgres"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(config.repository_type().is_err());
    }
}
