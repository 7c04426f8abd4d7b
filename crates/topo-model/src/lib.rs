//! Topology Model
//!
//! Typed cluster topology with a strict, canonical codec and immutable-field
//! validation.
//!
//! # Core Concepts
//!
//! - [`Topology`]: cluster -> role groups -> nodes -> config overrides
//! - [`TopologyCodec`]: strict YAML decode, deterministic canonical encode
//! - [`ImmutableFieldValidator`]: rejects changes to fields tagged immutable
//! - [`FieldPath`]: names a field of the tree in error messages
//! - [`ContentHash`]: Blake3 checksum of a topology's canonical text
//!
//! # Example
//!
//! ```rust
//! use topo_model::{ImmutableFieldValidator, TopologyCodec};
//!
//! let codec = TopologyCodec::new();
//! let original = codec.decode(b"groups:\n- name: g\n  nodes:\n  - {name: a, role: db, host: h1, port: 1}\n")?;
//! let candidate = codec.decode(b"groups:\n- name: g\n  nodes:\n  - {name: a, role: cache, host: h1, port: 1}\n")?;
//!
//! let err = ImmutableFieldValidator::new()
//!     .check_diff(&original, &candidate)
//!     .unwrap_err();
//! assert_eq!(err.path.to_string(), "groups.g.nodes.a.role");
//! # Ok::<(), topo_model::CodecError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codec;
mod hash;
mod immutable;
mod name;
mod path;
mod topology;

pub use codec::{canonicalize, CodecError, TopologyCodec};
pub use hash::{ContentHash, HashError};
pub use immutable::{Immutable, ImmutableFieldValidator, ImmutableFieldViolation, ABSENT, REMOVED};
pub use name::{validate_cluster_name, NameError, MAX_CLUSTER_NAME_LEN};
pub use path::{FieldPath, PathError};
pub use topology::{ConfigMap, GlobalOptions, NodeSpec, RoleGroup, Topology, TopologyError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
