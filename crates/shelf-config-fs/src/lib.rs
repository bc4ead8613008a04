// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `MetadataGateway` for Shelf tools (uses platform config dir).
//!
//! Each record lives in `<root>/<key>.json` as a full [`MetadataRecord`], so
//! the offline store speaks the same contract as the metadata API. A file that
//! no longer parses is reported as [`GatewayError::Corrupt`], which readers
//! treat like a malformed value and writers may overwrite.

use async_trait::async_trait;
use chrono::Utc;
use directories::ProjectDirs;
use shelf_metadata::{GatewayError, MetadataGateway, MetadataRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const RECORD_EXT: &str = "json";

/// Store metadata records as JSON files under a root directory.
pub struct FsMetadataGateway {
    base: PathBuf,
    // Serialises writers so id allocation and check-then-write stay consistent.
    write_lock: Mutex<()>,
}

impl FsMetadataGateway {
    /// Create a store rooted at the user config directory (e.g., `~/.config/Shelf`).
    pub fn new() -> Result<Self, GatewayError> {
        let proj = ProjectDirs::from("dev", "shelf", "Shelf").ok_or_else(|| {
            GatewayError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                "could not resolve config dir",
            ))
        })?;
        Self::with_root(proj.config_dir())
    }

    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn with_root(root: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let base = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the record files.
    pub fn root(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, GatewayError> {
        if !is_valid_key(key) {
            return Err(GatewayError::InvalidKey(key.to_string()));
        }
        Ok(self.base.join(format!("{key}.{RECORD_EXT}")))
    }

    async fn read_record(&self, key: &str) -> Result<MetadataRecord, GatewayError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::not_found(key))
            }
            Err(err) => return Err(GatewayError::Io(err)),
        };
        serde_json::from_slice(&bytes).map_err(|source| GatewayError::Corrupt {
            key: key.to_string(),
            source,
        })
    }

    async fn write_record(&self, record: &MetadataRecord) -> Result<(), GatewayError> {
        let path = self.path_for(&record.key)?;
        let data = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
        // Write-then-rename: readers never see a partial record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "wrote metadata record");
        Ok(())
    }

    async fn next_id(&self) -> Result<u64, GatewayError> {
        let mut max = 0;
        let mut entries = fs::read_dir(&self.base).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            // Unreadable neighbours do not block allocation.
            if let Ok(bytes) = fs::read(&path).await {
                if let Ok(rec) = serde_json::from_slice::<MetadataRecord>(&bytes) {
                    max = max.max(rec.id);
                }
            }
        }
        Ok(max + 1)
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[async_trait]
impl MetadataGateway for FsMetadataGateway {
    async fn fetch(&self, key: &str) -> Result<MetadataRecord, GatewayError> {
        self.read_record(key).await
    }

    async fn create(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        let _guard = self.write_lock.lock().await;
        match self.read_record(key).await {
            Ok(_) => return Err(GatewayError::Conflict { key: key.into() }),
            Err(err) if err.is_not_found() => {}
            Err(GatewayError::Corrupt { .. }) => {} // damaged file: overwrite it
            Err(err) => return Err(err),
        }
        let now = Utc::now();
        let record = MetadataRecord {
            id: self.next_id().await?,
            key: key.to_string(),
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn update(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(key).await?;
        record.value = value.to_string();
        record.updated_at = Utc::now();
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(GatewayError::not_found(key)),
            Err(err) => Err(GatewayError::Io(err)),
        }
    }
}
