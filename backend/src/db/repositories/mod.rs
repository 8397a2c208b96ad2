//! Roster repository implementations.
//!
//! - `toml_file`: roster persisted as `[[students]]` tables in a TOML file
//! - `local`: in-memory roster for tests and throwaway runs
pub mod local;
pub mod toml_file;

pub use local::LocalRepository;
pub use toml_file::TomlFileRepository;
