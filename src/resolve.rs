//! Path resolution for the mailtidy workspace.
//!
//! Resolution order for the workspace root:
//!   1. MAILTIDY_DATA environment variable
//!   2. the current directory
//!
//! Under the root: `data/` holds snapshots, `migrations/` holds migration files.

use std::path::PathBuf;

/// Return the workspace root.
pub fn root_dir() -> PathBuf {
    if let Ok(env) = std::env::var("MAILTIDY_DATA") {
        if !env.is_empty() {
            return expand_tilde(&env);
        }
    }
    PathBuf::from(".")
}

// --- Relative locations, joined onto a store root ---

pub const MIGRATIONS_DIR: &str = "migrations";
pub const LABELS_JSON: &str = "data/labels.json";
pub const FILTERS_JSON: &str = "data/filters.json";
pub const CONSOLIDATED_FILTERS_JSON: &str = "data/consolidated-filters.json";
pub const CONFIG_TOML: &str = "mailtidy.toml";

/// Get the user's home directory.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Expand ~ to home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}
