//! Source and backup file discovery
//!
//! Global invariants enforced:
//! - Returned paths are sorted
//! - Symbolic links are never followed or returned
//! - `.git` and `node_modules` are never entered

use crate::config::{ResolvedConfig, ALWAYS_SKIPPED_DIRS};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Check that a scan root exists, is a directory and can be listed
pub fn validate_root(root: &Path) -> Result<()> {
    let metadata =
        fs::metadata(root).with_context(|| format!("invalid path: {}", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("invalid path: {} is not a directory", root.display());
    }
    fs::read_dir(root).with_context(|| format!("invalid path: {} is not readable", root.display()))?;
    Ok(())
}

/// Collect every file under `root` that the configuration selects
pub fn collect_files(root: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, true, &mut files, &|path| config.should_include(path))?;
    files.sort();
    debug!(root = %root.display(), count = files.len(), "collected source files");
    Ok(files)
}

/// Collect every backup artifact under `root` ending in `suffix`
///
/// Extension and exclude filters do not apply, so that every backup an
/// earlier run made can be found again. A file named exactly `suffix` has
/// no original and is ignored.
pub fn collect_backups(root: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, false, &mut files, &|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.len() > suffix.len() && name.ends_with(suffix))
    })?;
    files.sort();
    debug!(root = %root.display(), count = files.len(), "collected backup files");
    Ok(files)
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    ALWAYS_SKIPPED_DIRS.contains(&name)
}

/// Recursively walk a directory, keeping files accepted by `keep`
///
/// Only the root's listing error is fatal; unreadable subdirectories and
/// entries are reported and skipped.
fn walk(
    dir: &Path,
    is_root: bool,
    files: &mut Vec<PathBuf>,
    keep: &dyn Fn(&Path) -> bool,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if !is_root => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read directory: {}", dir.display()))
        }
    };

    for entry_result in entries {
        let path = match entry_result {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping entry without metadata");
                continue;
            }
        };
        process_dir_entry(path, metadata, files, keep)?;
    }

    Ok(())
}

/// Process one directory entry, pushing kept files or recursing into dirs
fn process_dir_entry(
    path: PathBuf,
    metadata: fs::Metadata,
    files: &mut Vec<PathBuf>,
    keep: &dyn Fn(&Path) -> bool,
) -> Result<()> {
    if metadata.is_symlink() {
        return Ok(());
    }

    if metadata.is_dir() {
        if let Some(name) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
            if is_skipped_dir(name) {
                return Ok(());
            }
        }
        walk(&path, false, files, keep)?;
    } else if metadata.is_file() && keep(&path) {
        files.push(path);
    }

    Ok(())
}
