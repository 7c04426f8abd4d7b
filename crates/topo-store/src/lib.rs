//! Topology Metadata Store
//!
//! Durable storage for per-cluster metadata records.
//!
//! # Core Operations
//!
//! - **Load**: read a cluster's record, tolerating (but reporting) records
//!   that are readable yet inconsistent
//! - **Save**: replace a record atomically, keeping a backup of the
//!   previous one
//!
//! # Architecture
//!
//! ```text
//! MetadataStore (trait)
//!   ├── FileMetadataStore   <root>/clusters/<name>/meta.yaml
//!   └── MemoryMetadataStore in-process map
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod metadata;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult, ValidationIssue};
pub use file::FileMetadataStore;
pub use memory::MemoryMetadataStore;
pub use metadata::{topology_checksum, ClusterMetadata};
pub use store::MetadataStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
