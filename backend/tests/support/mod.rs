//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serializes every test that touches process environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the given variables set (`Some`) or removed (`None`).
///
/// Previous values are restored afterwards, also when `f` panics.
pub fn with_scoped_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore::apply(vars);
    f()
}

struct EnvRestore {
    saved: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn apply(vars: &[(&str, Option<&str>)]) -> Self {
        let mut saved: Vec<(String, Option<String>)> = Vec::new();
        for (key, value) in vars {
            if !saved.iter().any(|(k, _)| k == key) {
                saved.push((key.to_string(), std::env::var(key).ok()));
            }
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Write a roster file with one `[[students]]` table per entry.
pub fn write_roster(dir: &Path, students: &[(&str, &str, &str, u32)]) -> PathBuf {
    let path = dir.join("students.toml");
    let text: String = students
        .iter()
        .map(|(name, group, department, year)| {
            format!(
                "[[students]]\nname = \"{}\"\ngroup = \"{}\"\ndepartment = \"{}\"\nyear = {}\n\n",
                name, group, department, year
            )
        })
        .collect();
    std::fs::write(&path, text).expect("write roster");
    path
}
