//! In-process metadata store

use std::collections::BTreeMap;

use parking_lot::Mutex;
use topo_model::validate_cluster_name;

use crate::error::{StoreError, StoreResult};
use crate::metadata::{verify, ClusterMetadata};
use crate::store::MetadataStore;

/// Metadata store backed by a map
///
/// Follows the same contract as the filesystem store: records are replaced
/// whole under a lock, so saves are atomic with respect to loads.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Mutex<BTreeMap<String, ClusterMetadata>>,
}

impl MemoryMetadataStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record verbatim, bypassing bookkeeping
    ///
    /// Useful to simulate records written by older tools or damaged on disk.
    pub fn insert_raw(&self, name: &str, mut metadata: ClusterMetadata) {
        metadata.set_name(name);
        self.records.lock().insert(name.to_string(), metadata);
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if no record is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        validate_cluster_name(name)?;
        let metadata = self
            .records
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        verify(metadata)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        validate_cluster_name(name)?;
        let next = metadata
            .next_revision(name)
            .map_err(|source| StoreError::Encoding {
                path: name.into(),
                source,
            })?;
        let revision = next.revision();
        self.records.lock().insert(name.to_string(), next);
        Ok(revision)
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        validate_cluster_name(name)?;
        Ok(self.records.lock().contains_key(name))
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}
