//! Metadata store contract

use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::metadata::ClusterMetadata;

/// Loads and persists named cluster metadata
///
/// # Contract
/// - `load` fails with [`StoreError::NotFound`] for an unknown cluster and
///   with the recoverable [`StoreError::Validation`] when the record was
///   read but is inconsistent.
/// - `save` is atomic from the caller's perspective: afterwards `load`
///   sees either the complete new record or the complete previous one.
///   It returns the new revision.
pub trait MetadataStore {
    /// Load the record of `name`
    ///
    /// # Errors
    /// See the trait contract.
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata>;

    /// Persist `metadata` as the record of `name`
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] or [`StoreError::Encoding`] if the record
    /// could not be written; the previous record stays visible.
    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64>;

    /// Check whether a record exists for `name`
    ///
    /// # Errors
    /// Returns error if the backend cannot be queried.
    fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Names of every stored cluster, sorted
    ///
    /// # Errors
    /// Returns error if the backend cannot be queried.
    fn list(&self) -> StoreResult<Vec<String>>;

    /// Persist a record for a cluster that does not exist yet
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if `name` is taken and
    /// [`StoreError::Rejected`] if the topology is inconsistent.
    fn create(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        if self.exists(name)? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        metadata
            .topology()
            .validate()
            .map_err(|source| StoreError::Rejected {
                name: name.to_string(),
                source,
            })?;
        self.save(name, metadata)
    }
}

impl<T: MetadataStore + ?Sized> MetadataStore for &T {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        (**self).load(name)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        (**self).save(name, metadata)
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        (**self).exists(name)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        (**self).list()
    }
}

impl<T: MetadataStore + ?Sized> MetadataStore for Arc<T> {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        (**self).load(name)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        (**self).save(name, metadata)
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        (**self).exists(name)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        (**self).list()
    }
}

impl<T: MetadataStore + ?Sized> MetadataStore for Box<T> {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        (**self).load(name)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        (**self).save(name, metadata)
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        (**self).exists(name)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        (**self).list()
    }
}
