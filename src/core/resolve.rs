//! No-overwrite path resolution.
//!
//! Existing files are never replaced: when a requested path is taken, an
//! incrementing `_{n}` counter is spliced in before the suffix until a free
//! sibling is found.

use std::path::{Path, PathBuf};

/// Outcome of a no-overwrite resolution.
///
/// `requested` is the path the caller originally asked for; when the two
/// fields differ, the caller can report the rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub requested: PathBuf,
}

impl ResolvedPath {
    /// Whether resolution had to pick a different path than requested.
    pub fn was_renamed(&self) -> bool {
        self.path != self.requested
    }
}

fn with_appended(base: &Path, tail: &str) -> PathBuf {
    let mut joined = base.as_os_str().to_os_string();
    joined.push(tail);
    PathBuf::from(joined)
}

/// Resolve `base+suffix` to a path that does not exist yet.
///
/// If the requested path is free it is returned unchanged; otherwise
/// `base_1+suffix`, `base_2+suffix`, ... are probed in order and the first
/// free one wins. Check-time guarantee only: the caller must create the
/// object promptly.
pub fn no_overwrite_path(base_without_suffix: &Path, suffix: &str) -> ResolvedPath {
    let requested = with_appended(base_without_suffix, suffix);

    if !requested.exists() {
        return ResolvedPath {
            path: requested.clone(),
            requested,
        };
    }

    let mut add_id: u64 = 1;
    let mut candidate = with_appended(base_without_suffix, &format!("_{}{}", add_id, suffix));
    while candidate.exists() {
        add_id += 1;
        candidate = with_appended(base_without_suffix, &format!("_{}{}", add_id, suffix));
    }

    ResolvedPath {
        path: candidate,
        requested,
    }
}
