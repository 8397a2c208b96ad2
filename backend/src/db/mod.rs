//! Roster storage.
//!
//! The roster is the administrator-maintained list of students whose
//! schedules get checked. It is accessed through the Repository pattern so
//! the file-backed store can be swapped for an in-memory one.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  HTTP handlers / check runner               │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  Service Layer (services.rs)                │
//! │  - validation, display ordering             │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  StudentRepository trait (repository/)      │
//! └───────────┬─────────────────────┬───────────┘
//!             │                     │
//!   ┌─────────▼─────────┐ ┌─────────▼─────────┐
//!   │ TomlFileRepository│ │  LocalRepository  │
//!   │   (TOML file)     │ │   (in-memory)     │
//!   └───────────────────┘ └───────────────────┘
//! ```

pub mod factory;
pub mod repositories;
pub mod repository;
pub mod services;


pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::{LocalRepository, TomlFileRepository};
pub use repository::{ErrorContext, RepositoryError, RepositoryResult, StudentRepository};
