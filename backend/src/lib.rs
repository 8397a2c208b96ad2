//! # Lesson Audit
//!
//! Checks a university's published lesson schedule for workload and
//! scheduling-gap violations of the students on an administrator's roster.
//!
//! ## Pipeline
//!
//! 1. [`ingest`] collects the week's lessons from two sources: group lessons
//!    from the university portal and individual lessons from `.xls`
//!    spreadsheets. Both are normalized into [`models::Lesson`] and merged.
//! 2. [`services::violations`] evaluates every student's days against the
//!    daily load and gap rules.
//! 3. [`services::report`] renders the violations as an HTML report.
//!
//! ## Architecture
//!
//! - [`models`]: Student, lesson and violation value types
//! - [`ingest`]: Portal client, spreadsheet parser, merging and caching
//! - [`db`]: Roster storage behind the repository pattern
//! - [`services`]: Rules, report rendering and the background check job
//! - [`config`]: TOML configuration file
//! - [`http`]: Axum-based HTTP server and request handlers

// RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod ingest;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
