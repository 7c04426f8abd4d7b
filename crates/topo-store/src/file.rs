//! Filesystem metadata store
//!
//! One YAML record per cluster. Saves go through a temporary file in the
//! cluster directory that is synced and then renamed over `meta.yaml`, so
//! a reader never observes a partially written record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::Utc;
use tempfile::NamedTempFile;
use topo_model::{validate_cluster_name, CodecError};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::metadata::{verify, ClusterMetadata};
use crate::store::MetadataStore;

/// Metadata store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    config: StoreConfig,
    /// Keep a copy of the previous record before each save
    backups: bool,
}

impl FileMetadataStore {
    /// Create store over `config.root`
    #[inline]
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            backups: true,
        }
    }

    /// Enable or disable pre-save backups
    #[inline]
    #[must_use]
    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.backups = enabled;
        self
    }

    /// Storage configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn backup_previous(&self, name: &str, meta_path: &Path) -> StoreResult<()> {
        if !self.backups || !meta_path.exists() {
            return Ok(());
        }
        let dir = self.config.backup_dir(name);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io_error(&dir, e))?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        let target = dir.join(format!("meta-{stamp}.yaml"));
        fs::copy(meta_path, &target).map_err(|e| StoreError::io_error(&target, e))?;
        tracing::debug!(cluster = name, backup = %target.display(), "backed up previous metadata");
        Ok(())
    }
}

impl MetadataStore for FileMetadataStore {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        validate_cluster_name(name)?;
        let path = self.config.meta_path(name);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };

        let mut metadata: ClusterMetadata = serde_yaml::from_str(&content)
            .map_err(|source| StoreError::Decoding {
                path: path.clone(),
                source,
            })?;
        metadata.set_name(name);

        tracing::debug!(cluster = name, revision = metadata.revision(), "loaded metadata");
        verify(metadata)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        validate_cluster_name(name)?;
        let dir = self.config.cluster_dir(name);
        let path = self.config.meta_path(name);

        let next = metadata
            .next_revision(name)
            .map_err(|source| StoreError::Encoding {
                path: path.clone(),
                source,
            })?;
        let content = serde_yaml::to_string(&next).map_err(|e| StoreError::Encoding {
            path: path.clone(),
            source: CodecError::Encode(e),
        })?;

        fs::create_dir_all(&dir).map_err(|e| StoreError::io_error(&dir, e))?;
        self.backup_previous(name, &path)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io_error(&dir, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| StoreError::io_error(&path, e.error))?;

        tracing::info!(
            cluster = name,
            revision = next.revision(),
            checksum = %next.checksum().short(),
            "saved metadata"
        );
        Ok(next.revision())
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        validate_cluster_name(name)?;
        Ok(self.config.meta_path(name).is_file())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let dir = self.config.clusters_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io_error(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_error(&dir, e))?;
            if !entry.path().join("meta.yaml").is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
