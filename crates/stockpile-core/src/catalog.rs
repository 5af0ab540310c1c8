//! On-disk snapshot catalog
//!
//! Snapshots are `.json` survey payloads in a single directory. Their order is
//! the order they were written (file modification time), which is also the
//! order the viewer plays them back in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::survey::SurveyPayload;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid snapshot name: {0}")]
    InvalidName(String),
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("no snapshots available")]
    Empty,
}

/// One snapshot file in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// Answer to "what comes after the current snapshot"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextSnapshot {
    pub filename: String,
    pub total_files: usize,
    pub current_index: usize,
}

/// Directory of snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotCatalog {
    dir: PathBuf,
}

impl SnapshotCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshots ordered by modification time, oldest first
    pub fn list(&self) -> Result<Vec<SnapshotEntry>, CatalogError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            entries.push(SnapshotEntry {
                name: name.to_string(),
                modified: DateTime::<Utc>::from(metadata.modified()?),
            });
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        debug!(dir = %self.dir.display(), count = entries.len(), "Listed snapshots");
        Ok(entries)
    }

    /// The snapshot after `current`, wrapping to the first.
    ///
    /// An absent or unknown `current` yields the first snapshot.
    pub fn next_after(&self, current: Option<&str>) -> Result<NextSnapshot, CatalogError> {
        let entries = self.list()?;
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let next_index = current
            .and_then(|c| entries.iter().position(|e| e.name == c))
            .map_or(0, |i| (i + 1) % entries.len());

        Ok(NextSnapshot {
            filename: entries[next_index].name.clone(),
            total_files: entries.len(),
            current_index: next_index,
        })
    }

    /// Raw snapshot text
    pub fn read(&self, name: &str) -> Result<String, CatalogError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn load_survey(&self, name: &str) -> Result<SurveyPayload, CatalogError> {
        let content = self.read(name)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, CatalogError> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != ".."
            && !name.contains("..");
        if !plain {
            return Err(CatalogError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}
