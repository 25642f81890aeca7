//! Unique name allocation inside a parent directory.
//!
//! Two families:
//! - sequential-counter names (`novel_*`): `999` descending toward `100`,
//!   with a `#` prefix band appended on overflow. Larger numbers sort first
//!   lexicographically, so newer allocations list before older ones.
//! - random base-62 names (`novel_*_anum`): fixed-width strings over
//!   `0-9A-Z a-z`, drawn from a random start and linearly probed on
//!   collision.
//!
//! All guarantees are check-time: the caller owns the returned path and is
//! expected to populate it promptly (single writer per parent directory).
//! A fully exhausted namespace makes the allocators loop rather than fail;
//! with the default widths this is unreachable in practice.

use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::StowageError;

/// Base-62 digit alphabet: digits, then uppercase, then lowercase.
const ALPHANUM_CHARS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const COUNTER_CEILING: u32 = 999;
const COUNTER_FLOOR: u32 = 100;

/// Probe descending counter names until a free sibling is found.
///
/// `render` maps (overflow prefix, counter) to a candidate file name. When
/// the counter reaches the floor, one `#` is appended to the prefix and the
/// counter resets to the ceiling.
fn probe_descending<F>(parent: &Path, render: F) -> PathBuf
where
    F: Fn(&str, u32) -> String,
{
    let mut prefix = String::new();
    let mut counter = COUNTER_CEILING;

    let mut candidate = parent.join(render(&prefix, counter));
    while candidate.exists() {
        counter -= 1;
        candidate = parent.join(render(&prefix, counter));

        if counter <= COUNTER_FLOOR {
            prefix.push('#');
            counter = COUNTER_CEILING;
        }
    }
    candidate
}

/// Creates a new folder inside `parent` named `{counter}_{semantic_id}`,
/// e.g. `999_unet_large`. The numeric start of the name is unique among
/// siblings, which keeps listings ordered while leaving room for a readable
/// id after it.
pub fn novel_start_of_folder(parent: &Path, semantic_id: &str) -> Result<PathBuf, StowageError> {
    let path = probe_descending(parent, |prefix, counter| {
        format!("{}{}_{}", prefix, counter, semantic_id)
    });
    fs::create_dir_all(&path).map_err(StowageError::IoError)?;
    Ok(path)
}

/// Creates a new folder inside `parent` named `{base_name}_{counter}`.
pub fn novel_folder(parent: &Path, base_name: &str) -> Result<PathBuf, StowageError> {
    let path = probe_descending(parent, |prefix, counter| {
        format!("{}_{}{}", base_name, prefix, counter)
    });
    fs::create_dir_all(&path).map_err(StowageError::IoError)?;
    Ok(path)
}

/// Returns a free file path inside `parent` named `{base_name}_{counter}`.
///
/// Ensures `parent` exists but does not create the file; the caller writes
/// the content.
pub fn novel_filename(parent: &Path, base_name: &str) -> Result<PathBuf, StowageError> {
    fs::create_dir_all(parent).map_err(StowageError::IoError)?;
    Ok(probe_descending(parent, |prefix, counter| {
        format!("{}_{}{}", base_name, prefix, counter)
    }))
}

/// Render `num` as a fixed-width base-62 string, most-significant digit
/// first, zero-padded.
fn to_base62(mut num: u128, width: usize) -> String {
    let mut out = vec![b'0'; width];
    for slot in out.iter_mut().rev() {
        *slot = ALPHANUM_CHARS[(num % 62) as usize];
        num /= 62;
    }
    out.iter().map(|&b| b as char).collect()
}

fn base62_capacity(digit_num: u32) -> Result<u128, StowageError> {
    62u128.checked_pow(digit_num).ok_or_else(|| {
        StowageError::ValidationError(format!(
            "digit_num {} exceeds the representable base-62 namespace",
            digit_num
        ))
    })
}

/// Probe base-62 names from a random start, incrementing modulo the
/// namespace size until a free sibling is found.
fn probe_anum(parent: &Path, suffix: &str, digit_num: u32) -> Result<PathBuf, StowageError> {
    let capacity = base62_capacity(digit_num)?;
    let mut n = rand::thread_rng().gen_range(0..capacity);

    loop {
        let name = format!("{}{}", to_base62(n, digit_num as usize), suffix);
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
        n = (n + 1) % capacity;
    }
}

/// Creates a new folder inside `parent` with a unique base-62 name of
/// length `digit_num`. The default width of 10 gives 62^10 possible names,
/// so collisions are practically nonexistent.
pub fn novel_folder_anum(parent: &Path, digit_num: u32) -> Result<PathBuf, StowageError> {
    let path = probe_anum(parent, "", digit_num)?;
    fs::create_dir_all(&path).map_err(StowageError::IoError)?;
    Ok(path)
}

/// Returns a free path inside `parent` named `{base62}{suffix}` with a
/// base-62 name of length `digit_num`. Ensures `parent` exists but leaves
/// file creation to the caller.
pub fn novel_filename_anum(
    parent: &Path,
    suffix: &str,
    digit_num: u32,
) -> Result<PathBuf, StowageError> {
    fs::create_dir_all(parent).map_err(StowageError::IoError)?;
    probe_anum(parent, suffix, digit_num)
}

/// Creates a symlink at `link` pointing to `target`, replacing an existing
/// symlink at `link` first.
#[cfg(unix)]
pub fn replace_symlink(target: &Path, link: &Path) -> Result<(), StowageError> {
    if link.symlink_metadata().map(|m| m.is_symlink()).unwrap_or(false) {
        fs::remove_file(link).map_err(StowageError::IoError)?;
    }
    std::os::unix::fs::symlink(target, link).map_err(StowageError::IoError)?;
    Ok(())
}
