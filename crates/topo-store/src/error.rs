//! Error types for metadata storage
//!
//! Distinguishes fatal failures (unknown cluster, unreadable or unwritable
//! record) from the recoverable [`StoreError::Validation`], which still
//! carries the metadata that could be read.

use std::path::PathBuf;

use topo_model::{CodecError, ContentHash, NameError, TopologyError};

use crate::metadata::ClusterMetadata;

/// Why a stored record was considered inconsistent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    /// Topology failed structural validation
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Recorded checksum does not match the stored topology
    #[error("checksum mismatch: recorded {recorded}, computed {computed}")]
    Checksum {
        /// Checksum stored in the record
        recorded: ContentHash,
        /// Checksum of the stored topology
        computed: ContentHash,
    },
}

/// Metadata store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the cluster
    #[error("cluster '{0}' not found")]
    NotFound(String),

    /// Record was read but is inconsistent; `metadata` holds what was recovered
    #[error("metadata of cluster '{name}' failed validation: {reason}")]
    Validation {
        /// Cluster name
        name: String,
        /// Record as read
        metadata: Box<ClusterMetadata>,
        /// What is inconsistent
        #[source]
        reason: ValidationIssue,
    },

    /// Cluster name is not usable
    #[error("invalid cluster name: {0}")]
    InvalidName(#[from] NameError),

    /// A record already exists where a new one was requested
    #[error("cluster '{0}' already exists")]
    AlreadyExists(String),

    /// Topology offered for a new record is inconsistent
    #[error("topology of cluster '{name}' rejected: {source}")]
    Rejected {
        /// Cluster name
        name: String,
        /// Validation failure
        #[source]
        source: TopologyError,
    },

    /// Filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        /// Record location
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("failed to encode metadata {path}: {source}")]
    Encoding {
        /// Record location
        path: PathBuf,
        /// Encoder failure
        #[source]
        source: CodecError,
    },

    /// Record could not be parsed at all
    #[error("failed to decode metadata {path}: {source}")]
    Decoding {
        /// Record location
        path: PathBuf,
        /// Parser failure
        #[source]
        source: serde_yaml::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the cluster does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the error is the recoverable validation failure
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Metadata recovered from a validation failure
    ///
    /// # Errors
    /// Returns `self` unchanged for every other error kind.
    pub fn into_recovered(self) -> Result<(ClusterMetadata, ValidationIssue), Self> {
        match self {
            Self::Validation {
                metadata, reason, ..
            } => Ok((*metadata, reason)),
            other => Err(other),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
