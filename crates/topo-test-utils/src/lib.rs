//! Testing utilities for topoctl workspace
//!
//! Shared fixtures, a scripted confirmation gate and a store wrapper that
//! counts (and can fail) calls.

#![allow(missing_docs)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use topo_core::{ConfirmError, ConfirmationGate};
use topo_model::{NodeSpec, RoleGroup, Topology, TopologyCodec};
use topo_store::{ClusterMetadata, MemoryMetadataStore, MetadataStore, StoreError, StoreResult};

pub const CLUSTER: &str = "prod";

/// Two groups, three nodes; node `a` is a `db` with a config override
pub fn sample_topology() -> Topology {
    let mut a = NodeSpec::new("a", "db", "10.0.0.1", 4000);
    a.config.insert("log.level".to_string(), "info".into());
    Topology {
        groups: vec![
            RoleGroup::new("storage")
                .with_node(a)
                .with_node(NodeSpec::new("b", "db", "10.0.0.2", 4000)),
            RoleGroup::new("compute").with_node(NodeSpec::new("c", "cache", "10.0.0.3", 6379)),
        ],
        ..Topology::default()
    }
}

pub fn sample_metadata() -> ClusterMetadata {
    ClusterMetadata::new(CLUSTER, "tidb", "v7.5.0", sample_topology())
}

pub fn canonical_yaml(topology: &Topology) -> String {
    TopologyCodec::new().encode(topology).unwrap()
}

/// Memory store holding [`sample_metadata`] under [`CLUSTER`] at revision 1
pub fn seeded_store() -> MemoryMetadataStore {
    let store = MemoryMetadataStore::new();
    store.save(CLUSTER, &sample_metadata()).unwrap();
    store
}

/// Stored topology of `name` as canonical YAML
pub fn stored_yaml<S: MetadataStore>(store: &S, name: &str) -> String {
    canonical_yaml(store.load(name).unwrap().topology())
}

/// Gate giving the same answer every time and recording prompts
#[derive(Debug)]
pub struct ScriptedConfirm {
    answer: Result<(), ConfirmError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answer: Result<(), ConfirmError>) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(Ok(()))
    }

    pub fn declining() -> Self {
        Self::new(Err(ConfirmError::Declined))
    }

    pub fn interrupted() -> Self {
        Self::new(Err(ConfirmError::Interrupted))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl ConfirmationGate for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> Result<(), ConfirmError> {
        self.prompts.lock().push(prompt.to_string());
        self.answer.clone()
    }
}

/// Store wrapper counting calls, optionally failing every save
#[derive(Debug, Default)]
pub struct CountingStore<S> {
    inner: S,
    loads: AtomicUsize,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl<S: MetadataStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn failing_saves(self) -> Self {
        self.fail_saves.store(true, Ordering::SeqCst);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Save attempts, including failed ones
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl<S: MetadataStore> MetadataStore for CountingStore<S> {
    fn load(&self, name: &str) -> StoreResult<ClusterMetadata> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(name)
    }

    fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::io_error(
                format!("{name}/meta.yaml"),
                io::Error::other("injected save failure"),
            ));
        }
        self.inner.save(name, metadata)
    }

    fn exists(&self, name: &str) -> StoreResult<bool> {
        self.inner.exists(name)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        self.inner.list()
    }
}
