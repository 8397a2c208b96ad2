//! Error types for the schedule sources.

use std::path::PathBuf;

/// Failure of one (department, group) fetch against the schedule portal.
///
/// None of these abort an ingestion run; the orchestrator logs them and
/// omits that group's lessons.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("department '{0}' not found on the portal")]
    DepartmentNotFound(String),

    #[error("group '{group}' not found in department '{department}'")]
    GroupNotFound { department: String, group: String },

    /// The lesson list endpoint answered with markup, which it does when the
    /// session cookie expired or the group id is unknown.
    #[error("portal returned HTML instead of JSON; session expired or invalid group id")]
    UnexpectedMarkup,

    #[error("failed to decode lesson list: {source} (first 200 chars: {snippet})")]
    Decode {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    #[error("invalid portal configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    /// Expected miss when a group does not belong to the department being searched.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::GroupNotFound { .. })
    }
}

/// Failure of the individual-schedule parse as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no .xls files found under {0}")]
    NoInputFiles(PathBuf),

    #[error("failed to scan {root}: {source}")]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no lessons found in {0} file(s)")]
    NoLessons(usize),
}

/// Failure to open one spreadsheet; the file is skipped.
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::XlsError,
    },
}

/// Reason a block, day or row of a spreadsheet was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("empty {0} cell")]
    Empty(&'static str),

    #[error("no day columns in block starting at row {0}")]
    NoDayColumns(usize),

    #[error("no 4-digit year in '{0}'")]
    MissingYear(String),

    #[error("unparseable date '{0}'")]
    BadDate(String),

    #[error("discipline '{0}' is ignored")]
    IgnoredDiscipline(String),

    #[error("no room number in '{0}'")]
    MissingRoom(String),
}
