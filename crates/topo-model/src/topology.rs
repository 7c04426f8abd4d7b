//! Cluster topology model
//!
//! A topology is a tree: cluster -> role groups -> node specs -> key/value
//! config overrides, plus global options and per-role server configs.
//! Every struct rejects unknown keys so that operator-authored files are
//! validated rather than best-effort interpreted.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

/// Free-form configuration overrides (always mutable)
pub type ConfigMap = BTreeMap<String, serde_yaml::Value>;

/// Full description of a cluster's composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Options shared by every node
    #[serde(default)]
    pub global: GlobalOptions,

    /// Per-role configuration applied to all nodes of that role
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub server_configs: BTreeMap<String, ConfigMap>,

    /// Role groups, in declaration order
    #[serde(default)]
    pub groups: Vec<RoleGroup>,
}

/// Cluster-wide options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalOptions {
    /// Deploy user (immutable)
    #[serde(default = "default_user")]
    pub user: String,

    /// SSH port used to reach hosts
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Base deploy directory (immutable)
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: String,

    /// Base data directory (immutable)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// CPU architecture of the hosts
    #[serde(default = "default_arch")]
    pub arch: String,

    /// Operating system of the hosts
    #[serde(default = "default_os")]
    pub os: String,
}

fn default_user() -> String {
    "tidb".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_deploy_dir() -> String {
    "deploy".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_arch() -> String {
    "amd64".to_string()
}

fn default_os() -> String {
    "linux".to_string()
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            user: default_user(),
            ssh_port: default_ssh_port(),
            deploy_dir: default_deploy_dir(),
            data_dir: default_data_dir(),
            arch: default_arch(),
            os: default_os(),
        }
    }
}

/// A named group of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleGroup {
    /// Group identity (immutable)
    pub name: String,

    /// Overrides applied to every node of the group
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,

    /// Member nodes, in declaration order
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl RoleGroup {
    /// Create an empty group
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Add a node, returning the group
    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    /// Find a node by name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// A single node instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Node identity (immutable)
    pub name: String,

    /// Role type, e.g. `db` or `cache` (immutable)
    pub role: String,

    /// Host address (immutable)
    pub host: String,

    /// Service port (immutable)
    pub port: u16,

    /// Deploy directory override (immutable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_dir: Option<String>,

    /// Data directory override (immutable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Scheduling labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Per-node overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
}

impl NodeSpec {
    /// Create a node with no overrides
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            host: host.into(),
            port,
            deploy_dir: None,
            data_dir: None,
            labels: BTreeMap::new(),
            config: ConfigMap::new(),
        }
    }

    /// `host:port` identity of the node
    #[inline]
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Topology {
    /// Find a group by name
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&RoleGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Find a node by name in any group
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes().find(|n| n.name == name)
    }

    /// Iterate over every node in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.groups.iter().flat_map(|g| g.nodes.iter())
    }

    /// Total number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.groups.iter().map(|g| g.nodes.len()).sum()
    }

    /// Check structural consistency
    ///
    /// # Errors
    /// Returns the first inconsistency found: duplicate group or node names,
    /// a name containing `.`, two nodes sharing a `host:port`, an empty host
    /// or role, or port 0.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut groups = HashSet::new();
        let mut nodes = HashSet::new();
        let mut addresses: HashMap<String, &str> = HashMap::new();

        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(TopologyError::EmptyField(
                    FieldPath::root().child("groups").child("name"),
                ));
            }
            if group.name.contains('.') {
                return Err(TopologyError::DottedName {
                    path: FieldPath::root().child("groups"),
                    name: group.name.clone(),
                });
            }
            if !groups.insert(group.name.as_str()) {
                return Err(TopologyError::DuplicateGroup(group.name.clone()));
            }

            let base = FieldPath::root()
                .child("groups")
                .child(group.name.as_str())
                .child("nodes");
            for node in &group.nodes {
                if node.name.trim().is_empty() {
                    return Err(TopologyError::EmptyField(base.child("name")));
                }
                if node.name.contains('.') {
                    return Err(TopologyError::DottedName {
                        path: base.clone(),
                        name: node.name.clone(),
                    });
                }
                if !nodes.insert(node.name.as_str()) {
                    return Err(TopologyError::DuplicateNode(node.name.clone()));
                }

                let path = base.child(node.name.as_str());
                if node.host.trim().is_empty() {
                    return Err(TopologyError::EmptyField(path.child("host")));
                }
                if node.role.trim().is_empty() {
                    return Err(TopologyError::EmptyField(path.child("role")));
                }
                if node.port == 0 {
                    return Err(TopologyError::ZeroPort(path.child("port")));
                }

                if let Some(first) = addresses.insert(node.address(), node.name.as_str()) {
                    return Err(TopologyError::AddressConflict {
                        address: node.address(),
                        first: first.to_string(),
                        second: node.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Structural inconsistencies in a topology
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Two groups share a name
    #[error("duplicate group name: {0}")]
    DuplicateGroup(String),

    /// Two nodes share a name
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// Group or node name would be ambiguous inside a field path
    #[error("name '{name}' under {path} must not contain '.'")]
    DottedName {
        /// Collection holding the entry
        path: FieldPath,
        /// Offending name
        name: String,
    },

    /// Two nodes listen on the same address
    #[error("nodes '{first}' and '{second}' both use {address}")]
    AddressConflict {
        address: String,
        first: String,
        second: String,
    },

    /// Required field is blank
    #[error("field {0} must not be empty")]
    EmptyField(FieldPath),

    /// Port 0 is never valid for a node
    #[error("field {0} must be a non-zero port")]
    ZeroPort(FieldPath),
}
