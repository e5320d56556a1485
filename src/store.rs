//! Local JSON store: label/filter snapshots and migration files under one root.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filters::consolidate::ConsolidatedFilter;
use crate::gmail::types::{Filter, Label};
use crate::resolve;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(PathBuf),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.path(rel).exists()
    }

    pub fn read_bytes(&self, rel: impl AsRef<Path>) -> StoreResult<Vec<u8>> {
        let path = self.path(rel);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(path.clone())
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })
    }

    pub fn read_json<T: DeserializeOwned>(&self, rel: impl AsRef<Path>) -> StoreResult<T> {
        let path = self.path(&rel);
        let bytes = self.read_bytes(rel)?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })
    }

    /// Pretty-print `value` to `rel`, creating parent directories.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        rel: impl AsRef<Path>,
        value: &T,
    ) -> StoreResult<()> {
        let path = self.path(rel);
        let data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, data).map_err(|source| StoreError::Io { path, source })
    }

    /// File names (not paths) directly under `rel`.
    pub fn list_dir(&self, rel: impl AsRef<Path>) -> StoreResult<Vec<String>> {
        let path = self.path(rel);
        let entries = std::fs::read_dir(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(path.clone())
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(names)
    }

    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> StoreResult<()> {
        let from = self.path(from);
        let to = self.path(to);
        std::fs::rename(&from, &to).map_err(|source| StoreError::Io { path: from, source })
    }

    // --- Snapshots ---

    pub fn read_labels(&self) -> StoreResult<Vec<Label>> {
        self.read_json(resolve::LABELS_JSON)
    }

    pub fn save_labels(&self, labels: &[Label]) -> StoreResult<()> {
        self.write_json(resolve::LABELS_JSON, labels)
    }

    pub fn read_filters(&self) -> StoreResult<Vec<Filter>> {
        self.read_json(resolve::FILTERS_JSON)
    }

    pub fn save_filters(&self, filters: &[Filter]) -> StoreResult<()> {
        self.write_json(resolve::FILTERS_JSON, filters)
    }

    pub fn save_consolidated_filters(&self, groups: &[ConsolidatedFilter]) -> StoreResult<()> {
        self.write_json(resolve::CONSOLIDATED_FILTERS_JSON, groups)
    }
}
