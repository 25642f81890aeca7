//! Storage-root layout and first-time initialization.
//!
//! A storage root is a directory holding one project's fixed layout: four
//! structured documents plus two subfolders. Once created, the set of
//! top-level children never shrinks; documents missing on a later open read
//! as empty mappings.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::docs::{self, Doc};
use crate::core::error::StowageError;
use crate::core::naming;

/// Config document.
pub const MAIN_DOC: &str = "main.json";
/// Phase and session metadata shared across a process's lifetime.
pub const SHARED_STORAGE_DOC: &str = "shared_storage.json";
/// Index mirroring the `files/` area.
pub const FILE_TREE_DOC: &str = "file_tree.json";
/// Checkpoint index.
pub const CHECKPOINT_INDEX_DOC: &str = "tiny_db.json";
/// Retired document copies.
pub const OLD_DOCUMENTS_DIR: &str = "old_documents";
/// Checkpoint object files.
pub const FILES_DIR: &str = "files";

/// Role names accepted by [`StorageRoot::path_for`].
pub const PATH_ROLES: [&str; 6] = [
    "main",
    "shared_storage",
    "file_tree",
    "checkpoint_index",
    "old_documents",
    "files",
];

/// Handle to an opened storage root.
///
/// Paths for every role are fixed at open time; there is no process-wide
/// instance and no hidden initialization state. Callers that share a root
/// pass the handle by reference.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    root: PathBuf,
    main_doc: PathBuf,
    shared_storage_doc: PathBuf,
    file_tree_doc: PathBuf,
    checkpoint_index_doc: PathBuf,
    old_documents_dir: PathBuf,
    files_dir: PathBuf,
}

impl StorageRoot {
    fn from_root(root: PathBuf) -> Self {
        Self {
            main_doc: root.join(MAIN_DOC),
            shared_storage_doc: root.join(SHARED_STORAGE_DOC),
            file_tree_doc: root.join(FILE_TREE_DOC),
            checkpoint_index_doc: root.join(CHECKPOINT_INDEX_DOC),
            old_documents_dir: root.join(OLD_DOCUMENTS_DIR),
            files_dir: root.join(FILES_DIR),
            root,
        }
    }

    /// Open an existing root or create and initialize a new one.
    ///
    /// With `path_is_container` false, `path` is the exact root: if it
    /// exists it is returned as-is (no re-setup, no merge); if absent it is
    /// created and laid out. With `path_is_container` true, `path` is a
    /// container directory: it is created if missing and a fresh child is
    /// allocated inside it with a unique counter prefix and `semantic_id`
    /// in the name.
    pub fn open_or_create(
        path: &Path,
        path_is_container: bool,
        semantic_id: &str,
    ) -> Result<Self, StowageError> {
        if !path_is_container {
            if path.exists() {
                return Ok(Self::from_root(path.to_path_buf()));
            }
            fs::create_dir_all(path).map_err(StowageError::IoError)?;
            initialize_layout(path)?;
            return Ok(Self::from_root(path.to_path_buf()));
        }

        fs::create_dir_all(path).map_err(StowageError::IoError)?;
        let child = naming::novel_start_of_folder(path, semantic_id)?;
        initialize_layout(&child)?;
        Ok(Self::from_root(child))
    }

    /// Open a root that must already be initialized.
    pub fn open_existing(path: &Path) -> Result<Self, StowageError> {
        if !path.is_dir() || !path.join(FILES_DIR).is_dir() {
            return Err(StowageError::NotInitialized(format!(
                "{} is not an initialized storage root",
                path.display()
            )));
        }
        Ok(Self::from_root(path.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn main_doc(&self) -> &Path {
        &self.main_doc
    }

    pub fn shared_storage_doc(&self) -> &Path {
        &self.shared_storage_doc
    }

    pub fn file_tree_doc(&self) -> &Path {
        &self.file_tree_doc
    }

    pub fn checkpoint_index_doc(&self) -> &Path {
        &self.checkpoint_index_doc
    }

    pub fn old_documents_dir(&self) -> &Path {
        &self.old_documents_dir
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Look up a path by role name. Unknown roles are `NotFound`.
    pub fn path_for(&self, role: &str) -> Result<&Path, StowageError> {
        match role {
            "main" => Ok(&self.main_doc),
            "shared_storage" => Ok(&self.shared_storage_doc),
            "file_tree" => Ok(&self.file_tree_doc),
            "checkpoint_index" => Ok(&self.checkpoint_index_doc),
            "old_documents" => Ok(&self.old_documents_dir),
            "files" => Ok(&self.files_dir),
            other => Err(StowageError::NotFound(format!(
                "path role '{}' not registered; available: {}",
                other,
                PATH_ROLES.join(", ")
            ))),
        }
    }
}

/// Create the fixed layout inside `root`: each document as an empty mapping
/// (skipped if already present) and the two subfolders. Idempotent.
fn initialize_layout(root: &Path) -> Result<(), StowageError> {
    for doc_name in [
        MAIN_DOC,
        SHARED_STORAGE_DOC,
        FILE_TREE_DOC,
        CHECKPOINT_INDEX_DOC,
    ] {
        let doc_path = root.join(doc_name);
        if !doc_path.exists() {
            docs::write_doc(&Doc::new(), &doc_path)?;
        }
    }

    fs::create_dir_all(root.join(OLD_DOCUMENTS_DIR)).map_err(StowageError::IoError)?;
    fs::create_dir_all(root.join(FILES_DIR)).map_err(StowageError::IoError)?;
    Ok(())
}
