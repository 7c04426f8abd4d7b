//! Call-order guarantees, checked against mocked collaborators

use mockall::predicate::eq;
use mockall::{mock, Sequence};
use topo_core::{
    ChangeConfigError, ChangeOutcome, ConfirmError, ConfirmationGate, PipelineConfig,
    ReconciliationPipeline,
};
use topo_model::TopologyCodec;
use topo_store::{ClusterMetadata, MetadataStore, StoreError, StoreResult};
use topo_test_utils::{sample_metadata, sample_topology, CLUSTER};

mock! {
    Store {}
    impl MetadataStore for Store {
        fn load(&self, name: &str) -> StoreResult<ClusterMetadata>;
        fn save(&self, name: &str, metadata: &ClusterMetadata) -> StoreResult<u64>;
        fn exists(&self, name: &str) -> StoreResult<bool>;
        fn list(&self) -> StoreResult<Vec<String>>;
    }
}

mock! {
    Gate {}
    impl ConfirmationGate for Gate {
        fn confirm(&self, prompt: &str) -> Result<(), ConfirmError>;
    }
}

fn edited_candidate() -> String {
    let mut topology = sample_topology();
    topology.groups[1].nodes[0]
        .labels
        .insert("zone".to_string(), "z1".to_string());
    TopologyCodec::new().encode(&topology).unwrap()
}

fn loads_sample(store: &mut MockStore) {
    store
        .expect_load()
        .with(eq(CLUSTER))
        .times(1)
        .returning(|_| Ok(sample_metadata()));
}

#[test]
fn confirmation_precedes_save() {
    let mut seq = Sequence::new();
    let mut store = MockStore::new();
    let mut gate = MockGate::new();

    loads_sample(&mut store);
    gate.expect_confirm()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    store
        .expect_save()
        .withf(|name, metadata| {
            name == CLUSTER && metadata.topology().node("c").unwrap().labels["zone"] == "z1"
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(7));

    let pipeline = ReconciliationPipeline::new(store, gate, PipelineConfig::default());
    let outcome = pipeline
        .change_config_bytes(CLUSTER, edited_candidate().as_bytes(), false, &mut Vec::new())
        .unwrap();

    assert_eq!(outcome, ChangeOutcome::Applied { revision: 7 });
}

#[test]
fn declined_change_never_saves() {
    let mut store = MockStore::new();
    let mut gate = MockGate::new();

    loads_sample(&mut store);
    gate.expect_confirm()
        .times(1)
        .returning(|_| Err(ConfirmError::Declined));
    store.expect_save().never();

    let pipeline = ReconciliationPipeline::new(store, gate, PipelineConfig::default());
    let candidate = edited_candidate();
    let result =
        pipeline.change_config_bytes(CLUSTER, candidate.as_bytes(), false, &mut Vec::new());

    assert!(matches!(result, Err(ChangeConfigError::Cancelled)));
}

#[test]
fn missing_terminal_aborts_without_saving() {
    let mut store = MockStore::new();
    let mut gate = MockGate::new();

    loads_sample(&mut store);
    gate.expect_confirm()
        .times(1)
        .returning(|_| Err(ConfirmError::Terminal("stdin is not a terminal".into())));
    store.expect_save().never();

    let pipeline = ReconciliationPipeline::new(store, gate, PipelineConfig::default());
    let err = pipeline
        .change_config_bytes(CLUSTER, edited_candidate().as_bytes(), false, &mut Vec::new())
        .unwrap_err();

    assert!(!err.is_cancellation());
    assert!(matches!(err, ChangeConfigError::Confirmation(_)));
}

#[test]
fn store_failure_other_than_validation_is_fatal() {
    let mut store = MockStore::new();
    let mut gate = MockGate::new();

    store.expect_load().times(1).returning(|_| {
        Err(StoreError::io_error(
            "clusters/prod/meta.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ))
    });
    gate.expect_confirm().never();
    store.expect_save().never();

    let pipeline = ReconciliationPipeline::new(store, gate, PipelineConfig::default());
    let result =
        pipeline.change_config_bytes(CLUSTER, edited_candidate().as_bytes(), true, &mut Vec::new());

    assert!(matches!(result, Err(ChangeConfigError::Load { .. })));
}

#[test]
fn candidate_bytes_are_compared_not_reencoded() {
    let mut store = MockStore::new();
    let mut gate = MockGate::new();

    loads_sample(&mut store);
    gate.expect_confirm()
        .times(1)
        .returning(|_| Err(ConfirmError::Declined));
    store.expect_save().never();

    // Same topology, different layout
    let candidate = TopologyCodec::new()
        .encode(&sample_topology())
        .unwrap()
        .replace('\n', "\n\n");

    let pipeline = ReconciliationPipeline::new(store, gate, PipelineConfig::default());
    let result =
        pipeline.change_config_bytes(CLUSTER, candidate.as_bytes(), false, &mut Vec::new());

    assert!(matches!(result, Err(ChangeConfigError::Cancelled)));
}
