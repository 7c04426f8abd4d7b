use pretty_assertions::assert_eq;
use topo_core::{
    ChangeConfigError, ChangeConfigResult, ChangeOutcome, PipelineConfig, PipelineStage,
    ReconciliationPipeline, CONFIRM_PROMPT, NOTHING_CHANGED, NO_CHANGE_MESSAGE, REJECTED_PREFIX,
};
use topo_model::{NodeSpec, Topology, REMOVED};
use topo_store::{MemoryMetadataStore, MetadataStore};
use topo_test_utils::{
    canonical_yaml, sample_topology, seeded_store, stored_yaml, CountingStore, ScriptedConfirm,
    CLUSTER,
};

type Store = CountingStore<MemoryMetadataStore>;

fn fixture() -> Store {
    CountingStore::new(seeded_store())
}

fn run_with(
    store: &Store,
    gate: &ScriptedConfirm,
    config: PipelineConfig,
    candidate: &[u8],
    skip_confirm: bool,
) -> (ChangeConfigResult<ChangeOutcome>, String) {
    let pipeline = ReconciliationPipeline::new(store, gate, config);
    let mut out = Vec::new();
    let result = pipeline.change_config_bytes(CLUSTER, candidate, skip_confirm, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn run(
    store: &Store,
    gate: &ScriptedConfirm,
    candidate: &[u8],
    skip_confirm: bool,
) -> (ChangeConfigResult<ChangeOutcome>, String) {
    run_with(store, gate, PipelineConfig::default(), candidate, skip_confirm)
}

fn with_log_level(level: &str) -> Topology {
    let mut topology = sample_topology();
    topology.groups[0].nodes[0]
        .config
        .insert("log.level".to_string(), level.into());
    topology
}

fn assert_rejected(out: &str) {
    assert!(out.starts_with(REJECTED_PREFIX), "unexpected output: {out}");
    assert!(out.trim_end().ends_with(NOTHING_CHANGED), "unexpected output: {out}");
}

#[test]
fn identical_candidate_is_a_no_op() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let candidate = stored_yaml(&store, CLUSTER);

    let (result, out) = run(&store, &gate, candidate.as_bytes(), false);

    assert_eq!(result.unwrap(), ChangeOutcome::NoChange);
    assert_eq!(out, format!("{NO_CHANGE_MESSAGE}\n"));
    assert_eq!(gate.calls(), 0);
    assert_eq!(store.saves(), 0);
}

#[test]
fn changing_node_role_is_rejected_at_validation() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let before = stored_yaml(&store, CLUSTER);

    let mut candidate = sample_topology();
    candidate.groups[0].nodes[0].role = "cache".to_string();
    let (result, out) = run(&store, &gate, canonical_yaml(&candidate).as_bytes(), false);

    let err = result.unwrap_err();
    assert_eq!(err.stage(), PipelineStage::Validated);
    match err {
        ChangeConfigError::ImmutableField(violation) => {
            assert_eq!(violation.path.to_string(), "groups.storage.nodes.a.role");
            assert_eq!(violation.old, "db");
            assert_eq!(violation.new, "cache");
        }
        other => panic!("expected immutable field violation, got {other:?}"),
    }
    assert_rejected(&out);
    assert!(out.contains("groups.storage.nodes.a.role"));
    assert_eq!(gate.calls(), 0);
    assert_eq!(store.saves(), 0);
    assert_eq!(stored_yaml(&store, CLUSTER), before);
}

#[test]
fn removing_a_node_is_rejected() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();

    let mut candidate = sample_topology();
    candidate.groups[0].nodes.remove(1);
    let (result, _) = run(&store, &gate, canonical_yaml(&candidate).as_bytes(), true);

    match result.unwrap_err() {
        ChangeConfigError::ImmutableField(violation) => {
            assert_eq!(violation.path.to_string(), "groups.storage.nodes.b.name");
            assert_eq!(violation.new, REMOVED);
        }
        other => panic!("expected immutable field violation, got {other:?}"),
    }
    assert_eq!(store.saves(), 0);
}

#[test]
fn mutable_change_is_applied_after_confirmation() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let candidate = canonical_yaml(&with_log_level("debug"));

    let (result, out) = run(&store, &gate, candidate.as_bytes(), false);

    assert_eq!(result.unwrap(), ChangeOutcome::Applied { revision: 2 });
    assert_eq!(gate.prompts(), vec![CONFIRM_PROMPT.to_string()]);
    assert!(out.starts_with("--- prod (stored)\n+++ candidate\n"));
    assert!(out
        .lines()
        .any(|l| l.starts_with('-') && l.contains("log.level: info")));
    assert!(out
        .lines()
        .any(|l| l.starts_with('+') && l.contains("log.level: debug")));
    assert!(out.ends_with(
        "Applied successfully, please use `topoctl reload prod [-N <nodes>] [-R <roles>]` to reload config.\n"
    ));
    assert_eq!(store.saves(), 1);
}

#[test]
fn committed_record_encodes_to_candidate_bytes() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let mut topology = with_log_level("warn");
    topology.groups[1].nodes[0]
        .labels
        .insert("zone".to_string(), "z2".to_string());
    topology
        .server_configs
        .entry("db".to_string())
        .or_default()
        .insert("split.size".to_string(), 96_i64.into());
    let candidate = canonical_yaml(&topology);

    let (result, _) = run(&store, &gate, candidate.as_bytes(), false);
    assert!(matches!(result, Ok(ChangeOutcome::Applied { .. })));

    assert_eq!(stored_yaml(&store, CLUSTER), candidate);
    assert_eq!(store.inner().load(CLUSTER).unwrap().topology(), &topology);
}

#[test]
fn declined_confirmation_cancels_without_saving() {
    let store = fixture();
    let gate = ScriptedConfirm::declining();
    let before = stored_yaml(&store, CLUSTER);

    let (result, out) = run(
        &store,
        &gate,
        canonical_yaml(&with_log_level("debug")).as_bytes(),
        false,
    );

    let err = result.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(err.stage(), PipelineStage::AwaitingConfirmation);
    assert!(out.contains("+++ candidate"));
    assert!(!out.contains("Applied successfully"));
    assert_eq!(gate.calls(), 1);
    assert_eq!(store.saves(), 0);
    assert_eq!(stored_yaml(&store, CLUSTER), before);
}

#[test]
fn interrupted_confirmation_is_a_cancellation() {
    let store = fixture();
    let gate = ScriptedConfirm::interrupted();

    let (result, _) = run(
        &store,
        &gate,
        canonical_yaml(&with_log_level("debug")).as_bytes(),
        false,
    );

    assert!(matches!(result, Err(ChangeConfigError::Cancelled)));
    assert_eq!(store.saves(), 0);
}

#[test]
fn skip_confirm_saves_without_asking() {
    let store = fixture();
    let gate = ScriptedConfirm::declining();

    let (result, out) = run(
        &store,
        &gate,
        canonical_yaml(&with_log_level("debug")).as_bytes(),
        true,
    );

    assert_eq!(result.unwrap(), ChangeOutcome::Applied { revision: 2 });
    assert!(out.contains("+++ candidate"));
    assert_eq!(gate.calls(), 0);
    assert_eq!(store.saves(), 1);
}

#[test]
fn unparseable_candidate_leaves_record_unchanged() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let before = stored_yaml(&store, CLUSTER);

    let (result, out) = run(&store, &gate, b"groups: [unclosed", false);

    let err = result.unwrap_err();
    assert!(matches!(err, ChangeConfigError::Parse(_)));
    assert_eq!(err.stage(), PipelineStage::Parsed);
    assert_rejected(&out);
    assert_eq!(gate.calls(), 0);
    assert_eq!(store.saves(), 0);
    assert_eq!(stored_yaml(&store, CLUSTER), before);
}

#[test]
fn unknown_key_is_a_parse_error() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let candidate = format!("{}unexpected: true\n", stored_yaml(&store, CLUSTER));

    let (result, out) = run(&store, &gate, candidate.as_bytes(), true);

    assert!(matches!(result, Err(ChangeConfigError::Parse(_))));
    assert!(out.contains("unexpected"));
    assert_eq!(store.saves(), 0);
}

#[test]
fn inconsistent_candidate_is_rejected() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();

    let mut candidate = sample_topology();
    candidate.groups[1]
        .nodes
        .push(NodeSpec::new("d", "cache", "10.0.0.1", 4000));
    let (result, out) = run(&store, &gate, canonical_yaml(&candidate).as_bytes(), true);

    let err = result.unwrap_err();
    assert!(matches!(err, ChangeConfigError::Invalid(_)));
    assert_eq!(err.stage(), PipelineStage::Parsed);
    assert_rejected(&out);
    assert_eq!(store.saves(), 0);
}

#[test]
fn dotted_node_name_is_rejected_before_confirmation() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();

    let mut candidate = sample_topology();
    candidate.groups[1]
        .nodes
        .push(NodeSpec::new("d.1", "cache", "10.0.0.9", 6379));
    let (result, out) = run(&store, &gate, canonical_yaml(&candidate).as_bytes(), false);

    assert!(matches!(result, Err(ChangeConfigError::Invalid(_))));
    assert!(out.contains("must not contain '.'"));
    assert_eq!(gate.calls(), 0);
    assert_eq!(store.saves(), 0);
}

#[test]
fn formatting_only_difference_still_needs_confirmation() {
    let store = fixture();
    let gate = ScriptedConfirm::declining();
    let candidate = format!("# edited by hand\n{}", stored_yaml(&store, CLUSTER));

    let (result, out) = run(&store, &gate, candidate.as_bytes(), false);

    assert!(matches!(result, Err(ChangeConfigError::Cancelled)));
    assert!(out.contains("+# edited by hand"));
    assert_eq!(gate.calls(), 1);
}

#[test]
fn unknown_cluster_is_not_found() {
    let store = CountingStore::new(MemoryMetadataStore::new());
    let gate = ScriptedConfirm::accepting();

    let (result, out) = run(&store, &gate, b"groups: []\n", false);

    let err = result.unwrap_err();
    assert!(matches!(err, ChangeConfigError::NotFound(ref name) if name == CLUSTER));
    assert_eq!(err.stage(), PipelineStage::Loaded);
    assert!(out.is_empty());
    assert_eq!(gate.calls(), 0);
}

#[test]
fn invalid_cluster_name_never_reaches_store() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());

    let result = pipeline.change_config_bytes("../etc", b"groups: []\n", true, &mut Vec::new());

    assert!(matches!(result, Err(ChangeConfigError::InvalidName(_))));
    assert_eq!(store.loads(), 0);
}

#[test]
fn inconsistent_stored_record_is_tolerated() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();

    // Out-of-band edit: checksum no longer matches the topology
    let mut tampered = store.inner().load(CLUSTER).unwrap();
    let edited = with_log_level("error");
    tampered.set_topology(edited.clone());
    store.inner().insert_raw(CLUSTER, tampered);
    assert!(store.inner().load(CLUSTER).unwrap_err().is_validation());

    let mut candidate = edited;
    candidate.groups[0].nodes[1]
        .labels
        .insert("rack".to_string(), "r1".to_string());
    let candidate = canonical_yaml(&candidate);

    let (result, _) = run(&store, &gate, candidate.as_bytes(), true);

    assert_eq!(result.unwrap(), ChangeOutcome::Applied { revision: 2 });
    assert_eq!(stored_yaml(&store, CLUSTER), candidate);
}

#[test]
fn failed_save_reports_unpersisted_change() {
    let store = CountingStore::new(seeded_store()).failing_saves();
    let gate = ScriptedConfirm::accepting();
    let before = stored_yaml(store.inner(), CLUSTER);

    let (result, out) = run(
        &store,
        &gate,
        canonical_yaml(&with_log_level("debug")).as_bytes(),
        false,
    );

    let err = result.unwrap_err();
    assert_eq!(err.stage(), PipelineStage::Committed);
    assert!(matches!(err, ChangeConfigError::Save { ref name, .. } if name == CLUSTER));
    assert!(err.to_string().contains("NOT persisted"));
    assert!(!out.contains("Applied successfully"));
    assert_eq!(store.saves(), 1);
    assert_eq!(stored_yaml(store.inner(), CLUSTER), before);
}

#[test]
fn colour_settings_reach_output() {
    let store = fixture();
    let gate = ScriptedConfirm::accepting();
    let config = PipelineConfig::default()
        .with_color(true)
        .with_program_name("tiup-cluster");

    let (result, out) = run_with(
        &store,
        &gate,
        config,
        canonical_yaml(&with_log_level("debug")).as_bytes(),
        false,
    );

    assert!(result.is_ok());
    assert!(out.contains("\x1b[32m+"));
    assert!(gate.prompts()[0].contains(CONFIRM_PROMPT));
    assert!(out.contains("`tiup-cluster reload prod"));
}
