//! Checkpoint session: phase tracking plus named, versioned saves.
//!
//! A session owns the in-memory copies of a storage root's four documents
//! and is constructed explicitly; callers that share one pass it by
//! reference. Checkpoint names are mutable pointers in the index (saving
//! the same name again moves the pointer), while the object files written
//! under `files/` are never overwritten. A save that fails partway leaves
//! orphaned object files behind but never a torn index entry: the index
//! write is the defining final step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::json;

use crate::core::docs::{self, Doc};
use crate::core::error::StowageError;
use crate::core::resolve::{self, ResolvedPath};
use crate::core::root::StorageRoot;
use crate::core::time;
use crate::core::tree;

/// Capability interface for objects stored in a checkpoint.
///
/// The content is an opaque blob to the store; the codec is whatever the
/// implementor chooses. `finalize` runs once before serialization and is a
/// no-op by default; implement it only on types that must flush or mark
/// internal state before being persisted.
pub trait StoredObject {
    fn finalize(&mut self) {}
    fn to_bytes(&self) -> Result<Vec<u8>, StowageError>;
}

/// One entry in the checkpoint index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub name: String,
    pub phase: String,
    pub saved_at: String,
    pub description: String,
    /// Logical role (e.g. `model`, `logs`) to the on-disk filename actually
    /// used under `files/`.
    pub files: BTreeMap<String, String>,
}

/// Per-role result of loading a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<u8>),
    /// The recorded file has since been deleted from disk.
    Missing,
}

/// A loaded checkpoint: its index record plus whatever object blobs could
/// still be read. Callers must check per-role outcomes before use.
#[derive(Debug, Clone)]
pub struct LoadedCheckpoint {
    pub record: CheckpointRecord,
    pub objects: BTreeMap<String, LoadOutcome>,
}

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Phase tag a fresh root starts in.
    pub initial_phase: String,
    /// Suffix for checkpoint object files, including the dot.
    pub object_suffix: String,
    /// Recorded in shared state on first open.
    pub project_name: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_phase: "setup".to_string(),
            object_suffix: ".bin".to_string(),
            project_name: None,
        }
    }
}

/// Summary of the session's current state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub project_name: Option<String>,
    pub storage_root: PathBuf,
    pub current_phase: String,
    pub total_checkpoints: u64,
    pub latest_checkpoint: Option<String>,
    pub available_checkpoints: Vec<String>,
}

pub struct CheckpointSession {
    root: StorageRoot,
    options: SessionOptions,
    config: Doc,
    shared: Doc,
    file_tree: Doc,
    index: BTreeMap<String, CheckpointRecord>,
    current_phase: String,
}

impl CheckpointSession {
    /// Open a session over a storage root, loading all four documents.
    ///
    /// A fresh root (empty shared state) is seeded with project metadata
    /// and the initial phase; an established root restores its recorded
    /// phase.
    pub fn open(root: StorageRoot, options: SessionOptions) -> Result<Self, StowageError> {
        let config = docs::read_doc(root.main_doc())?;
        let mut shared = docs::read_doc(root.shared_storage_doc())?;
        let file_tree = docs::read_doc(root.file_tree_doc())?;

        let index_doc = docs::read_doc(root.checkpoint_index_doc())?;
        let mut index = BTreeMap::new();
        for (name, value) in index_doc {
            let record: CheckpointRecord = serde_json::from_value(value)?;
            index.insert(name, record);
        }

        let seeded = shared.is_empty();
        if seeded {
            shared.insert(
                "project_name".to_string(),
                json!(options.project_name.clone()),
            );
            shared.insert("created_at".to_string(), json!(time::now_epoch_z()));
            shared.insert(
                "current_phase".to_string(),
                json!(options.initial_phase.clone()),
            );
            shared.insert("latest_checkpoint".to_string(), json!(null));
            shared.insert("total_checkpoints".to_string(), json!(0));
        }

        let current_phase = shared
            .get("current_phase")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| options.initial_phase.clone());

        let session = Self {
            config,
            shared,
            file_tree,
            index,
            current_phase,
            options,
            root,
        };
        if seeded {
            docs::write_doc(&session.shared, session.root.shared_storage_doc())?;
        }
        Ok(session)
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    pub fn current_phase(&self) -> &str {
        &self.current_phase
    }

    /// Config document for caller bookkeeping; persisted by
    /// [`save_documents`](Self::save_documents).
    pub fn config(&self) -> &Doc {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Doc {
        &mut self.config
    }

    pub fn shared_state(&self) -> &Doc {
        &self.shared
    }

    /// Move to a new phase tag and persist immediately.
    ///
    /// Tags are free text; transitions are recorded, not validated, and may
    /// revisit earlier tags.
    pub fn change_phase(&mut self, new_phase: &str) -> Result<(), StowageError> {
        let transition = json!({
            "from": self.current_phase.clone(),
            "to": new_phase,
            "at": time::now_epoch_z(),
        });

        let history = self
            .shared
            .entry("phase_changes".to_string())
            .or_insert_with(|| json!([]));
        if let Some(entries) = history.as_array_mut() {
            entries.push(transition);
        } else {
            *history = json!([transition]);
        }

        self.shared
            .insert("current_phase".to_string(), json!(new_phase));
        self.current_phase = new_phase.to_string();

        docs::write_doc(&self.shared, self.root.shared_storage_doc())
    }

    /// Persist a named checkpoint of one or more objects.
    ///
    /// Each object is finalized, serialized, and written under `files/` as
    /// `{name}_{role}{suffix}` resolved through the no-overwrite prober, so
    /// files from an earlier save of the same name stay intact. The index
    /// entry for `name` is then replaced (last write wins) and the file
    /// tree, index, and shared state are persisted in that order.
    pub fn save_checkpoint(
        &mut self,
        name: &str,
        description: &str,
        objects: &mut [(&str, &mut dyn StoredObject)],
    ) -> Result<CheckpointRecord, StowageError> {
        if name.is_empty() {
            return Err(StowageError::ValidationError(
                "checkpoint name cannot be empty".to_string(),
            ));
        }

        let saved_at = time::now_epoch_z();
        let mut files = BTreeMap::new();

        for (role, object) in objects.iter_mut() {
            if role.is_empty() {
                return Err(StowageError::ValidationError(format!(
                    "checkpoint '{}' has an object with an empty role",
                    name
                )));
            }

            object.finalize();
            let bytes = object.to_bytes()?;

            let base = self.root.files_dir().join(format!("{}_{}", name, role));
            let resolved = resolve::no_overwrite_path(&base, &self.options.object_suffix);
            fs::write(&resolved.path, &bytes).map_err(StowageError::IoError)?;

            let relative = resolved
                .path
                .strip_prefix(self.root.root())
                .unwrap_or(&resolved.path)
                .to_path_buf();
            tree::record_file(&mut self.file_tree, &relative, bytes.len() as u64, &saved_at);

            let filename = resolved
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.insert(role.to_string(), filename);
        }

        let record = CheckpointRecord {
            name: name.to_string(),
            phase: self.current_phase.clone(),
            saved_at,
            description: description.to_string(),
            files,
        };
        self.index.insert(name.to_string(), record.clone());

        self.shared
            .insert("latest_checkpoint".to_string(), json!(name));
        let total = self
            .shared
            .get("total_checkpoints")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        self.shared
            .insert("total_checkpoints".to_string(), json!(total + 1));
        if let Some(model_file) = record.files.get("model") {
            self.shared
                .insert("latest_model_file".to_string(), json!(model_file));
        }

        docs::write_doc(&self.file_tree, self.root.file_tree_doc())?;
        docs::write_doc(&self.index_to_doc()?, self.root.checkpoint_index_doc())?;
        docs::write_doc(&self.shared, self.root.shared_storage_doc())?;

        Ok(record)
    }

    /// Load a checkpoint by name.
    ///
    /// Fails with `NotFound` when the name is absent from the index. A
    /// recorded file that has since been deleted is reported per-role as
    /// [`LoadOutcome::Missing`] rather than aborting the load.
    pub fn load_checkpoint(&self, name: &str) -> Result<LoadedCheckpoint, StowageError> {
        let record = self.index.get(name).ok_or_else(|| {
            let available: Vec<&str> = self.index.keys().map(String::as_str).collect();
            StowageError::NotFound(format!(
                "checkpoint '{}' not found; available: [{}]",
                name,
                available.join(", ")
            ))
        })?;

        let mut objects = BTreeMap::new();
        for (role, filename) in &record.files {
            let path = self.root.files_dir().join(filename);
            if path.exists() {
                let bytes = fs::read(&path).map_err(StowageError::IoError)?;
                objects.insert(role.clone(), LoadOutcome::Loaded(bytes));
            } else {
                objects.insert(role.clone(), LoadOutcome::Missing);
            }
        }

        Ok(LoadedCheckpoint {
            record: record.clone(),
            objects,
        })
    }

    /// All checkpoint records, ordered by name.
    pub fn checkpoints(&self) -> Vec<&CheckpointRecord> {
        self.index.values().collect()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            project_name: self
                .shared
                .get("project_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            storage_root: self.root.root().to_path_buf(),
            current_phase: self.current_phase.clone(),
            total_checkpoints: self
                .shared
                .get("total_checkpoints")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            latest_checkpoint: self
                .shared
                .get("latest_checkpoint")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            available_checkpoints: self.index.keys().cloned().collect(),
        }
    }

    /// Copy a document's current on-disk content into `old_documents/`
    /// under a no-overwrite name. Accepts the document roles of
    /// [`StorageRoot::path_for`]; directory roles are rejected.
    pub fn archive_document(&self, role: &str) -> Result<ResolvedPath, StowageError> {
        let source = self.root.path_for(role)?;
        if !source.is_file() {
            return Err(StowageError::ValidationError(format!(
                "path role '{}' is not a document",
                role
            )));
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| role.to_string());
        let suffix = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let base = self.root.old_documents_dir().join(stem);
        let resolved = resolve::no_overwrite_path(&base, &suffix);
        fs::copy(source, &resolved.path).map_err(StowageError::IoError)?;
        Ok(resolved)
    }

    /// Persist all four documents from their in-memory copies.
    pub fn save_documents(&self) -> Result<(), StowageError> {
        docs::write_doc(&self.config, self.root.main_doc())?;
        docs::write_doc(&self.file_tree, self.root.file_tree_doc())?;
        docs::write_doc(&self.index_to_doc()?, self.root.checkpoint_index_doc())?;
        docs::write_doc(&self.shared, self.root.shared_storage_doc())?;
        Ok(())
    }

    fn index_to_doc(&self) -> Result<Doc, StowageError> {
        let mut doc = Doc::new();
        for (name, record) in &self.index {
            doc.insert(name.clone(), serde_json::to_value(record)?);
        }
        Ok(doc)
    }
}
