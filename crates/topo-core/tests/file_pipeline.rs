//! End-to-end runs against the filesystem store

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use topo_core::{ChangeConfigError, ChangeOutcome, PipelineConfig, ReconciliationPipeline};
use topo_store::{FileMetadataStore, MetadataStore, StoreConfig};
use topo_test_utils::{canonical_yaml, sample_metadata, sample_topology, ScriptedConfirm, CLUSTER};

fn seeded(dir: &Path) -> FileMetadataStore {
    let store = FileMetadataStore::new(StoreConfig::new(dir.join("home")));
    store.create(CLUSTER, &sample_metadata()).unwrap();
    store
}

fn write_candidate(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("candidate.yaml");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn change_config_reads_file_and_commits() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(dir.path());
    let gate = ScriptedConfirm::accepting();

    let mut topology = sample_topology();
    topology.global.ssh_port = 2222;
    let candidate = canonical_yaml(&topology);
    let path = write_candidate(&dir, &candidate);

    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());
    let outcome = pipeline
        .change_config(CLUSTER, &path, false, &mut Vec::new())
        .unwrap();

    assert_eq!(outcome, ChangeOutcome::Applied { revision: 2 });
    let stored = store.load(CLUSTER).unwrap();
    assert_eq!(stored.topology().global.ssh_port, 2222);
    assert_eq!(canonical_yaml(stored.topology()), candidate);

    let backups = fs::read_dir(store.config().backup_dir(CLUSTER))
        .unwrap()
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn unchanged_file_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(dir.path());
    let gate = ScriptedConfirm::accepting();
    let meta = store.config().meta_path(CLUSTER);
    let before = fs::read_to_string(&meta).unwrap();

    let path = write_candidate(&dir, &canonical_yaml(&sample_topology()));
    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());
    let outcome = pipeline
        .change_config(CLUSTER, &path, false, &mut Vec::new())
        .unwrap();

    assert_eq!(outcome, ChangeOutcome::NoChange);
    assert_eq!(fs::read_to_string(&meta).unwrap(), before);
    assert!(!store.config().backup_dir(CLUSTER).exists());
}

#[test]
fn missing_candidate_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(dir.path());
    let gate = ScriptedConfirm::accepting();

    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());
    let err = pipeline
        .change_config(CLUSTER, dir.path().join("nope.yaml"), true, &mut Vec::new())
        .unwrap_err();

    match err {
        ChangeConfigError::ReadCandidate { path, .. } => assert!(path.ends_with("nope.yaml")),
        other => panic!("expected read failure, got {other:?}"),
    }
}

#[test]
fn missing_cluster_is_checked_before_reading_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::new(StoreConfig::new(dir.path()));
    let gate = ScriptedConfirm::accepting();

    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());
    let err = pipeline
        .change_config("staging", dir.path().join("nope.yaml"), true, &mut Vec::new())
        .unwrap_err();

    assert!(matches!(err, ChangeConfigError::NotFound(_)));
}

#[test]
fn diff_header_names_cluster_and_candidate_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(dir.path());
    let gate = ScriptedConfirm::accepting();

    let mut topology = sample_topology();
    topology.global.ssh_port = 2222;
    let path = write_candidate(&dir, &canonical_yaml(&topology));

    let pipeline = ReconciliationPipeline::new(&store, &gate, PipelineConfig::default());
    let mut out = Vec::new();
    pipeline
        .change_config(CLUSTER, &path, false, &mut out)
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    let expected = format!("--- {CLUSTER} (stored)\n+++ {}\n", path.display());
    assert!(out.starts_with(&expected), "unexpected header in {out}");
}
