//! Locate, read and write migration files under `migrations/`.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use super::error::{MigrationError, MigrationResult};
use super::record::MigrationRecord;
use crate::resolve::MIGRATIONS_DIR;
use crate::store::{Store, StoreError};

static ONE_OFF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.json$").unwrap());
static DAILY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^daily-[0-9]+\.json$").unwrap());

/// Which family of migration files a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// `<digits>.json`, renamed to `-complete` once applied.
    OneOff,
    /// `daily-<digits>.json`, reapplied on every run.
    Daily,
}

impl MigrationKind {
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            MigrationKind::OneOff => ONE_OFF_RE.is_match(file_name),
            MigrationKind::Daily => DAILY_RE.is_match(file_name),
        }
    }
}

/// Pending file names of `kind`, ascending.
pub fn pending_files(store: &Store, kind: MigrationKind) -> MigrationResult<Vec<String>> {
    let names = match store.list_dir(MIGRATIONS_DIR) {
        Ok(names) => names,
        Err(StoreError::NotFound(_)) => return Err(MigrationError::NoPendingMigrations),
        Err(e) => return Err(e.into()),
    };
    let mut pending: Vec<String> = names.into_iter().filter(|n| kind.matches(n)).collect();
    if pending.is_empty() {
        return Err(MigrationError::NoPendingMigrations);
    }
    pending.sort();
    Ok(pending)
}

/// `1700000000.json` → `1700000000-complete.json`.
pub fn completed_name(file_name: &str) -> String {
    let lower = file_name.to_lowercase();
    let stem = lower.strip_suffix(".json").unwrap_or(&lower);
    format!("{}-complete.json", stem)
}

pub fn read_file(store: &Store, file_name: &str) -> MigrationResult<Vec<MigrationRecord>> {
    let rel = Path::new(MIGRATIONS_DIR).join(file_name);
    match store.read_json(&rel) {
        Ok(records) => Ok(records),
        Err(StoreError::Json { path, source }) => Err(MigrationError::Unreadable { path, source }),
        Err(e) => Err(e.into()),
    }
}

/// Write `records` as a new one-off file named after `now`; returns the file name.
///
/// If a file with that timestamp already exists the number is bumped until free.
pub fn write_file(
    store: &Store,
    records: &[MigrationRecord],
    now: DateTime<Local>,
) -> MigrationResult<String> {
    let mut stamp: u64 = now
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or_default();
    let file_name = loop {
        let candidate = format!("{}.json", stamp);
        let rel = Path::new(MIGRATIONS_DIR).join(&candidate);
        if !store.exists(&rel) && !store.exists(Path::new(MIGRATIONS_DIR).join(completed_name(&candidate))) {
            break candidate;
        }
        stamp += 1;
    };
    store.write_json(Path::new(MIGRATIONS_DIR).join(&file_name), records)?;
    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn touch(tmp: &TempDir, name: &str) {
        let dir = tmp.path().join(MIGRATIONS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), "[]").unwrap();
    }

    #[test]
    fn test_kind_patterns() {
        assert!(MigrationKind::OneOff.matches("20240101120000.json"));
        assert!(!MigrationKind::OneOff.matches("daily-1.json"));
        assert!(!MigrationKind::OneOff.matches("20240101120000-complete.json"));
        assert!(MigrationKind::Daily.matches("daily-1.json"));
        assert!(!MigrationKind::Daily.matches("daily-abc.json"));
    }

    #[test]
    fn test_pending_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "3.json");
        touch(&tmp, "1.json");
        touch(&tmp, "2-complete.json");
        touch(&tmp, "daily-5.json");
        touch(&tmp, "notes.txt");
        let store = Store::new(tmp.path());
        assert_eq!(
            pending_files(&store, MigrationKind::OneOff).unwrap(),
            vec!["1.json".to_string(), "3.json".to_string()]
        );
        assert_eq!(
            pending_files(&store, MigrationKind::Daily).unwrap(),
            vec!["daily-5.json".to_string()]
        );
    }

    #[test]
    fn test_no_pending() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        assert!(matches!(
            pending_files(&store, MigrationKind::OneOff),
            Err(MigrationError::NoPendingMigrations)
        ));
        touch(&tmp, "1-complete.json");
        assert!(matches!(
            pending_files(&store, MigrationKind::OneOff),
            Err(MigrationError::NoPendingMigrations)
        ));
    }

    #[test]
    fn test_completed_name() {
        assert_eq!(completed_name("1700000000.json"), "1700000000-complete.json");
        assert_eq!(completed_name("Daily-1.JSON"), "daily-1-complete.json");
    }

    #[test]
    fn test_unreadable_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(MIGRATIONS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("1.json"), "{oops").unwrap();
        let store = Store::new(tmp.path());
        assert!(matches!(
            read_file(&store, "1.json"),
            Err(MigrationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_write_file_bumps_on_collision() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let first = write_file(&store, &[], now).unwrap();
        let second = write_file(&store, &[], now).unwrap();
        assert_eq!(first, "20240301093000.json");
        assert_eq!(second, "20240301093001.json");
        assert!(MigrationKind::OneOff.matches(&second));
    }
}
