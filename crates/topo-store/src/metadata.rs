//! Cluster metadata record

use serde::{Deserialize, Serialize};
use topo_model::{canonicalize, CodecError, ContentHash, Topology, TopologyCodec};

use crate::error::{StoreError, ValidationIssue};

/// Durable record for one named cluster
///
/// `revision` and `checksum` are bookkeeping owned by the store; callers
/// only read and replace the topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterMetadata {
    /// Cluster name, taken from the record's location rather than its body
    #[serde(skip)]
    name: String,

    /// Deploy user
    pub user: String,

    /// Cluster version
    pub version: String,

    /// Number of successful saves
    #[serde(default)]
    revision: u64,

    /// Blake3 of the topology's canonical text
    #[serde(default)]
    checksum: ContentHash,

    /// Cluster composition
    topology: Topology,
}

impl ClusterMetadata {
    /// Create a record that has never been saved
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        version: impl Into<String>,
        topology: Topology,
    ) -> Self {
        Self {
            name: name.into(),
            user: user.into(),
            version: version.into(),
            revision: 0,
            checksum: ContentHash::default(),
            topology,
        }
    }

    /// Cluster name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current topology
    #[inline]
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Replace the topology wholesale
    #[inline]
    pub fn set_topology(&mut self, topology: Topology) {
        self.topology = topology;
    }

    /// Store revision (0 if never saved)
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Checksum recorded at last save
    #[inline]
    #[must_use]
    pub fn checksum(&self) -> ContentHash {
        self.checksum
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Copy prepared for persisting: next revision, fresh checksum, canonical topology
    pub(crate) fn next_revision(&self, name: &str) -> Result<Self, CodecError> {
        let mut next = self.clone();
        next.name = name.to_string();
        next.topology = canonicalize(&self.topology);
        next.revision = self.revision + 1;
        next.checksum = topology_checksum(&next.topology)?;
        Ok(next)
    }
}

/// Blake3 of the canonical encoding of `topology`
///
/// # Errors
/// Returns error if the topology cannot be encoded.
pub fn topology_checksum(topology: &Topology) -> Result<ContentHash, CodecError> {
    let text = TopologyCodec::new().encode(topology)?;
    Ok(ContentHash::compute(text.as_bytes()))
}

/// Check a freshly read record, turning inconsistencies into the
/// recoverable [`StoreError::Validation`]
pub(crate) fn verify(metadata: ClusterMetadata) -> Result<ClusterMetadata, StoreError> {
    let issue = match metadata.topology.validate() {
        Err(e) => Some(ValidationIssue::Topology(e)),
        Ok(()) if metadata.checksum.is_zero() => None,
        Ok(()) => match topology_checksum(&metadata.topology) {
            Ok(computed) if computed != metadata.checksum => Some(ValidationIssue::Checksum {
                recorded: metadata.checksum,
                computed,
            }),
            Ok(_) => None,
            Err(source) => {
                return Err(StoreError::Encoding {
                    path: metadata.name.clone().into(),
                    source,
                })
            }
        },
    };

    match issue {
        None => Ok(metadata),
        Some(reason) => {
            tracing::warn!(cluster = %metadata.name, %reason, "stored metadata failed validation");
            Err(StoreError::Validation {
                name: metadata.name.clone(),
                metadata: Box::new(metadata),
                reason,
            })
        }
    }
}
