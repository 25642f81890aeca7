//! File-tree index maintenance.
//!
//! The file-tree document mirrors the directory structure under the storage
//! root's `files/` area so it can be inspected without re-walking the
//! filesystem. Nodes live under a top-level `root` object; directory keys
//! carry a trailing `/`, leaves record when the file was added and how big
//! it was. Entries are never pruned automatically, so a leaf can outlive
//! its file.

use serde_json::{Map, Value, json};
use std::path::Path;

use crate::core::docs::Doc;

fn as_object_or_reset(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Record a leaf for `relative_path` (relative to the storage root),
/// creating intermediate directory nodes as needed. An existing leaf for
/// the same path is replaced.
pub fn record_file(tree: &mut Doc, relative_path: &Path, size_bytes: u64, added_at: &str) {
    let parts: Vec<String> = relative_path
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect();
    let Some((leaf, folders)) = parts.split_last() else {
        return;
    };

    let root_value = tree
        .entry("root".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let mut node = as_object_or_reset(root_value);

    for folder in folders {
        let child = node
            .entry(format!("{}/", folder))
            .or_insert_with(|| Value::Object(Map::new()));
        node = as_object_or_reset(child);
    }

    node.insert(
        leaf.clone(),
        json!({
            "added_at": added_at,
            "size_bytes": size_bytes,
        }),
    );
}

/// Look up the leaf entry recorded for `relative_path`, if any.
pub fn find_entry<'a>(tree: &'a Doc, relative_path: &Path) -> Option<&'a Value> {
    let parts: Vec<String> = relative_path
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect();
    let (leaf, folders) = parts.split_last()?;

    let mut node = tree.get("root")?.as_object()?;
    for folder in folders {
        node = node.get(&format!("{}/", folder))?.as_object()?;
    }
    node.get(leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn nested_path_builds_directory_nodes() {
        let mut tree = Doc::new();
        let path = PathBuf::from("files/ckpt_model.bin");
        record_file(&mut tree, &path, 42, "1771220592Z");

        let entry = find_entry(&tree, &path).expect("entry recorded");
        assert_eq!(entry["size_bytes"], 42);
        assert_eq!(entry["added_at"], "1771220592Z");

        let root = tree.get("root").and_then(|v| v.as_object()).expect("root");
        assert!(root.contains_key("files/"));
    }

    #[test]
    fn same_path_replaces_the_leaf() {
        let mut tree = Doc::new();
        let path = PathBuf::from("files/logs.bin");
        record_file(&mut tree, &path, 10, "1Z");
        record_file(&mut tree, &path, 20, "2Z");

        let entry = find_entry(&tree, &path).expect("entry recorded");
        assert_eq!(entry["size_bytes"], 20);
    }

    #[test]
    fn sibling_files_share_directory_nodes() {
        let mut tree = Doc::new();
        record_file(&mut tree, &PathBuf::from("files/a.bin"), 1, "1Z");
        record_file(&mut tree, &PathBuf::from("files/b.bin"), 2, "1Z");

        let files = tree
            .get("root")
            .and_then(|v| v.as_object())
            .and_then(|root| root.get("files/"))
            .and_then(|v| v.as_object())
            .expect("files node");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn empty_path_is_ignored() {
        let mut tree = Doc::new();
        record_file(&mut tree, &PathBuf::new(), 0, "1Z");
        assert!(tree.is_empty());
    }
}
