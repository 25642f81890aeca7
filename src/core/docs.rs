//! Structured-document codec: JSON mappings on disk.
//!
//! The single format every storage-root document uses. Reading a missing or
//! empty file yields an empty mapping, never an error; writing creates
//! missing parent directories and fully overwrites the target unless the
//! no-overwrite mode is requested. There is no partial-write protection
//! beyond the filesystem's own guarantees.

use std::fs;
use std::path::Path;

use crate::core::error::StowageError;
use crate::core::resolve::{self, ResolvedPath};

/// A structured document: a JSON object keyed by strings.
pub type Doc = serde_json::Map<String, serde_json::Value>;

/// Read a document from `path`. Missing file or blank content reads as an
/// empty mapping; malformed non-empty JSON propagates.
pub fn read_doc(path: &Path) -> Result<Doc, StowageError> {
    if !path.exists() {
        return Ok(Doc::new());
    }
    let raw = fs::read_to_string(path).map_err(StowageError::IoError)?;
    if raw.trim().is_empty() {
        return Ok(Doc::new());
    }
    let doc: Doc = serde_json::from_str(&raw)?;
    Ok(doc)
}

/// Write a document to `path`, creating missing parents and overwriting any
/// existing file.
pub fn write_doc(doc: &Doc, path: &Path) -> Result<(), StowageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StowageError::IoError)?;
    }
    let bytes = serde_json::to_vec_pretty(doc)?;
    fs::write(path, bytes).map_err(StowageError::IoError)?;
    Ok(())
}

/// Write a document without replacing an existing one: the target is probed
/// through the no-overwrite resolver first. Returns where the write landed
/// so callers can report a rename.
pub fn write_doc_no_overwrite(
    doc: &Doc,
    base_without_suffix: &Path,
    suffix: &str,
) -> Result<ResolvedPath, StowageError> {
    let resolved = resolve::no_overwrite_path(base_without_suffix, suffix);
    write_doc(doc, &resolved.path)?;
    Ok(resolved)
}
