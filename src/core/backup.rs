//! Non-duplicate backups.
//!
//! Copies files into a backup directory, skipping any whose target name is
//! already present. Name equality is the sole dedup key; content is never
//! compared. This keeps large recurring artifacts (model weights carried
//! across checkpoints) from being duplicated on every save.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::StowageError;

/// Per-source classification, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupOutcome {
    /// Source was copied into the backup directory.
    Copied,
    /// A same-named file already exists in the backup directory.
    AlreadyPresent,
    /// Source path does not exist (or has no usable file name).
    Missing,
}

/// Copy each source into `backup_dir` unless a same-named file is already
/// there. Returns one outcome per input, same order and length.
///
/// Missing sources are recorded, not raised; filesystem failures on a copy
/// propagate. Nested source paths flatten to their basenames. Permissions
/// and file times are carried over onto the copy.
pub fn backup_if_absent(
    sources: &[PathBuf],
    backup_dir: &Path,
) -> Result<Vec<BackupOutcome>, StowageError> {
    let mut outcomes = Vec::with_capacity(sources.len());

    for source in sources {
        if !source.exists() {
            outcomes.push(BackupOutcome::Missing);
            continue;
        }
        let Some(file_name) = source.file_name() else {
            outcomes.push(BackupOutcome::Missing);
            continue;
        };

        let target = backup_dir.join(file_name);
        if target.exists() {
            outcomes.push(BackupOutcome::AlreadyPresent);
            continue;
        }

        fs::create_dir_all(backup_dir).map_err(StowageError::IoError)?;
        fs::copy(source, &target).map_err(StowageError::IoError)?;
        preserve_file_times(source, &target)?;
        outcomes.push(BackupOutcome::Copied);
    }

    Ok(outcomes)
}

fn preserve_file_times(source: &Path, target: &Path) -> Result<(), StowageError> {
    let metadata = fs::metadata(source).map_err(StowageError::IoError)?;
    let mut times = fs::FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    let file = fs::File::options()
        .write(true)
        .open(target)
        .map_err(StowageError::IoError)?;
    file.set_times(times).map_err(StowageError::IoError)?;
    Ok(())
}
