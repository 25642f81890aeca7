use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use stowage::core::backup::{self, BackupOutcome};
use stowage::core::checkpoint::{
    CheckpointSession, LoadOutcome, SessionOptions, StoredObject,
};
use stowage::core::docs::{self, Doc};
use stowage::core::error::StowageError;
use stowage::core::naming;
use stowage::core::resolve;
use stowage::core::root::{CHECKPOINT_INDEX_DOC, StorageRoot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TrainingLogs {
    epochs: Vec<u32>,
    losses: Vec<f32>,
    is_saved: bool,
}

impl StoredObject for TrainingLogs {
    fn finalize(&mut self) {
        self.is_saved = true;
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StowageError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelState {
    layers: Vec<u32>,
    accuracy: f32,
}

impl StoredObject for ModelState {
    fn to_bytes(&self) -> Result<Vec<u8>, StowageError> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn decode<T: for<'de> Deserialize<'de>>(outcome: &LoadOutcome) -> T {
    let LoadOutcome::Loaded(bytes) = outcome else {
        panic!("expected loaded object, got {:?}", outcome);
    };
    serde_json::from_slice(bytes).expect("decode object")
}

fn open_session(root_path: &Path) -> CheckpointSession {
    let root = StorageRoot::open_or_create(root_path, false, "").expect("open root");
    CheckpointSession::open(root, SessionOptions::default()).expect("open session")
}

#[test]
fn sequential_allocations_into_one_parent_are_all_distinct() {
    let tmp = tempdir().expect("tempdir");
    let mut paths = HashSet::new();

    for _ in 0..25 {
        let path = naming::novel_start_of_folder(tmp.path(), "run").expect("allocate");
        assert!(path.is_dir(), "{} should exist", path.display());
        assert!(paths.insert(path), "allocation returned a duplicate");
    }
    assert_eq!(paths.len(), 25);
}

#[test]
fn no_overwrite_resolution_never_touches_prior_content() {
    let tmp = tempdir().expect("tempdir");
    let base = tmp.path().join("snapshot");

    let first = resolve::no_overwrite_path(&base, ".json");
    fs::write(&first.path, b"first snapshot").expect("write");

    let second = resolve::no_overwrite_path(&base, ".json");
    assert_ne!(first.path, second.path);
    fs::write(&second.path, b"second snapshot").expect("write");

    let original = fs::read(&first.path).expect("read");
    assert_eq!(original, b"first snapshot");
}

#[test]
fn backup_is_idempotent_per_source() {
    let tmp = tempdir().expect("tempdir");
    let weights = tmp.path().join("weights.bin");
    let metrics = tmp.path().join("metrics.json");
    fs::write(&weights, b"w").expect("write");
    fs::write(&metrics, b"{}").expect("write");

    let sources = vec![weights, tmp.path().join("ghost.bin"), metrics];
    let backup_dir = tmp.path().join("backups");

    let first = backup::backup_if_absent(&sources, &backup_dir).expect("first");
    assert_eq!(
        first,
        vec![
            BackupOutcome::Copied,
            BackupOutcome::Missing,
            BackupOutcome::Copied,
        ]
    );

    let second = backup::backup_if_absent(&sources, &backup_dir).expect("second");
    assert_eq!(
        second,
        vec![
            BackupOutcome::AlreadyPresent,
            BackupOutcome::Missing,
            BackupOutcome::AlreadyPresent,
        ]
    );
}

#[test]
fn checkpoint_round_trip_restores_objects_and_phase() {
    let tmp = tempdir().expect("tempdir");
    let mut session = open_session(&tmp.path().join("store"));
    session.change_phase("training").expect("phase");

    let mut logs = TrainingLogs {
        epochs: vec![1, 2, 3],
        losses: vec![2.0, 1.4, 0.9],
        is_saved: false,
    };
    let record = session
        .save_checkpoint("after_training", "third epoch done", &mut [("logs", &mut logs)])
        .expect("save");
    assert_eq!(record.phase, "training");

    let loaded = session.load_checkpoint("after_training").expect("load");
    assert_eq!(loaded.record.phase, "training");
    assert_eq!(loaded.record.description, "third epoch done");

    let restored: TrainingLogs = decode(&loaded.objects["logs"]);
    assert_eq!(restored, logs);
}

#[test]
fn checkpoint_index_survives_reopen() {
    let tmp = tempdir().expect("tempdir");
    let store = tmp.path().join("store");

    {
        let mut session = open_session(&store);
        let mut model = ModelState {
            layers: vec![128, 64, 10],
            accuracy: 0.85,
        };
        session
            .save_checkpoint("c1", "", &mut [("model", &mut model)])
            .expect("save");
    }

    let session = open_session(&store);
    let status = session.status();
    assert_eq!(status.total_checkpoints, 1);
    assert_eq!(status.latest_checkpoint.as_deref(), Some("c1"));
    assert_eq!(status.available_checkpoints, vec!["c1".to_string()]);

    let loaded = session.load_checkpoint("c1").expect("load");
    let restored: ModelState = decode(&loaded.objects["model"]);
    assert_eq!(restored.layers, vec![128, 64, 10]);
}

#[test]
fn resaving_a_name_moves_the_pointer_but_keeps_prior_files() {
    let tmp = tempdir().expect("tempdir");
    let mut session = open_session(&tmp.path().join("store"));

    let mut model = ModelState {
        layers: vec![8],
        accuracy: 0.1,
    };
    let first = session
        .save_checkpoint("best", "", &mut [("model", &mut model)])
        .expect("first save");

    model.accuracy = 0.9;
    let second = session
        .save_checkpoint("best", "", &mut [("model", &mut model)])
        .expect("second save");

    let first_file = &first.files["model"];
    let second_file = &second.files["model"];
    assert_ne!(first_file, second_file);

    let files_dir = session.root().files_dir().to_path_buf();
    let original: ModelState =
        serde_json::from_slice(&fs::read(files_dir.join(first_file)).expect("read"))
            .expect("decode");
    assert!((original.accuracy - 0.1).abs() < f32::EPSILON);

    // The index holds one entry for the name, pointing at the newest file.
    let index = docs::read_doc(&session.root().root().join(CHECKPOINT_INDEX_DOC))
        .expect("read index");
    assert_eq!(index.len(), 1);
    assert_eq!(index["best"]["files"]["model"], second_file.as_str());
}

#[test]
fn partial_load_reports_missing_roles_per_object() {
    let tmp = tempdir().expect("tempdir");
    let mut session = open_session(&tmp.path().join("store"));

    let mut logs = TrainingLogs {
        epochs: vec![1],
        losses: vec![0.5],
        is_saved: false,
    };
    let mut model = ModelState {
        layers: vec![16],
        accuracy: 0.7,
    };
    let record = session
        .save_checkpoint(
            "mixed",
            "",
            &mut [("logs", &mut logs), ("model", &mut model)],
        )
        .expect("save");

    let model_path = session.root().files_dir().join(&record.files["model"]);
    fs::remove_file(&model_path).expect("delete model file");

    let loaded = session.load_checkpoint("mixed").expect("load");
    assert_eq!(loaded.objects["model"], LoadOutcome::Missing);
    let survivor: TrainingLogs = decode(&loaded.objects["logs"]);
    assert_eq!(survivor.epochs, vec![1]);
}

#[test]
fn container_mode_session_lands_in_a_counter_named_child() {
    let tmp = tempdir().expect("tempdir");
    let container = tmp.path().join("experiments");

    let root = StorageRoot::open_or_create(&container, true, "classifier").expect("root");
    assert!(root.root().ends_with("999_classifier"));

    let options = SessionOptions {
        project_name: Some("classifier".to_string()),
        ..SessionOptions::default()
    };
    let session = CheckpointSession::open(root, options).expect("session");
    assert_eq!(session.status().project_name.as_deref(), Some("classifier"));
}

#[test]
fn file_tree_records_saved_objects() {
    let tmp = tempdir().expect("tempdir");
    let mut session = open_session(&tmp.path().join("store"));

    let mut model = ModelState {
        layers: vec![4],
        accuracy: 0.2,
    };
    let record = session
        .save_checkpoint("c1", "", &mut [("model", &mut model)])
        .expect("save");

    let tree: Doc =
        docs::read_doc(&session.root().root().join("file_tree.json")).expect("read tree");
    let entry = &tree["root"]["files/"][record.files["model"].as_str()];
    assert!(entry["size_bytes"].as_u64().expect("size") > 0);
    assert!(entry["added_at"].is_string());
}

#[test]
fn base62_width_two_finds_the_single_free_slot() {
    const ALPHABET: &[u8; 62] =
        b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    fn render(mut n: u32) -> String {
        let mut out = [b'0'; 2];
        for slot in out.iter_mut().rev() {
            *slot = ALPHABET[(n % 62) as usize];
            n /= 62;
        }
        out.iter().map(|&b| b as char).collect()
    }

    let tmp = tempdir().expect("tempdir");
    let free_slot = 1234u32;
    for n in 0..62u32 * 62 {
        if n == free_slot {
            continue;
        }
        fs::create_dir(tmp.path().join(render(n))).expect("prefill");
    }

    let allocated = naming::novel_folder_anum(tmp.path(), 2).expect("allocate");
    let name = allocated
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    assert_eq!(name, render(free_slot));
    assert!(allocated.is_dir());
}
