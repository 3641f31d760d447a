use serde::de::IgnoredAny;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{CollectionError, Result};
use crate::models::Record;

/// Snapshot of the whole collection kept as a single JSON array on disk.
///
/// The file is only ever replaced wholesale; there is no incremental update and no
/// locking, since a single short-lived process owns it.
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every cached record, in the order they were saved.
    pub async fn load(&self) -> Result<Vec<Record>> {
        let content = fs::read(&self.path)
            .await
            .map_err(|e| CollectionError::io(&self.path, e))?;
        let records: Vec<Record> = serde_json::from_slice(&content)
            .map_err(|e| CollectionError::decode("cache file", e))?;
        debug!("📂 {} records loaded from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Number of cached records, used as the staleness probe.
    ///
    /// Elements are skipped rather than decoded into `Record`. A missing snapshot
    /// counts as empty so the first run always rebuilds.
    pub async fn length(&self) -> Result<usize> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache at {}, treating as empty", self.path.display());
                return Ok(0);
            }
            Err(e) => return Err(CollectionError::io(&self.path, e)),
        };
        let entries: Vec<IgnoredAny> = serde_json::from_slice(&content)
            .map_err(|e| CollectionError::decode("cache file", e))?;
        Ok(entries.len())
    }

    /// Replaces the snapshot with `records`.
    ///
    /// Writes a sibling temp file and renames it over the snapshot, so readers see
    /// either the old array or the new one.
    pub async fn save(&self, records: &[Record]) -> Result<()> {
        // Make sure the cache directory exists
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CollectionError::io(dir, e))?;
        }

        let content = serde_json::to_vec(records)
            .map_err(|e| CollectionError::io(&self.path, io::Error::other(e)))?;
        // Write to a temp file, then swap it in
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| CollectionError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CollectionError::io(&self.path, e))?;

        info!("💾 Records cached to {}", self.path.display());
        Ok(())
    }
}
