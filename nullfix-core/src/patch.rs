//! Previewing, applying and reverting rewrites
//!
//! Global invariants enforced:
//! - An original file is never written before its backup exists
//! - A failure on one file never stops processing of the others
//! - Nothing is written outside apply and restore

use crate::discover::collect_backups;
use crate::rewrite::{rewrite_source, RewritePlan, RewriteStyle};
use crate::FileFailure;
use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Operating mode, selected once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Report candidates only
    #[default]
    List,
    /// Print a line diff of every change
    DryRun,
    /// Back up and rewrite files
    Apply,
    /// Move backups back over their originals
    Restore,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::List => "list",
            Mode::DryRun => "dry-run",
            Mode::Apply => "apply",
            Mode::Restore => "restore",
        }
    }

    /// Whether the mode needs rewritten text
    pub fn rewrites(&self) -> bool {
        matches!(self, Mode::DryRun | Mode::Apply)
    }
}

/// A file whose rewritten text differs from its current text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub original: String,
    pub rewritten: String,
}

/// Rewritten files plus the files that could not be read
#[derive(Debug, Default)]
pub struct Prepared {
    pub changes: Vec<FileChange>,
    pub failures: Vec<FileFailure>,
}

/// Result of applying one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied { backup: PathBuf },
    /// The original was left untouched
    BackupFailed { reason: String },
    WriteFailed { reason: String, restored: bool },
}

/// Result of restoring one backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub original: PathBuf,
    pub backup: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RestoreOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Rewrite every planned file in path order
///
/// Files whose rewritten text is byte-identical to the original are left
/// out of the result.
pub fn prepare(plan: &RewritePlan, style: RewriteStyle) -> Prepared {
    let mut prepared = Prepared::default();

    for (path, file_plan) in plan.files() {
        let original = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "cannot read planned file");
                prepared.failures.push(FileFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let rewritten = rewrite_source(&original, file_plan, style);
        if rewritten == original {
            debug!(file = %path.display(), "rewrite produced no change");
            continue;
        }
        debug!(file = %path.display(), style = style.as_str(), "rewrote file");
        prepared.changes.push(FileChange {
            path: path.clone(),
            original,
            rewritten,
        });
    }

    prepared
}

/// Line diff of one change
///
/// Every line index whose text differs is printed as an old/new pair with
/// its 1-based line number.
pub fn preview(change: &FileChange) -> String {
    let old: Vec<&str> = change.original.split('\n').collect();
    let new: Vec<&str> = change.rewritten.split('\n').collect();
    let mut out = String::new();

    for line in 0..old.len().max(new.len()) {
        let a = old.get(line).copied().unwrap_or("");
        let b = new.get(line).copied().unwrap_or("");
        if a != b {
            let _ = writeln!(out, "-{:4}: {}", line + 1, a);
            let _ = writeln!(out, "+{:4}: {}", line + 1, b);
        }
    }
    out.push_str("---- end preview ----\n");
    out
}

/// Sibling backup location: the original path with `suffix` appended
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Back up the original, then write the rewritten text
///
/// An existing backup is overwritten. If the write fails the original is
/// copied back from the backup.
pub fn apply_change(change: &FileChange, suffix: &str) -> ApplyOutcome {
    apply_change_with(change, suffix, write_rewritten)
}

fn write_rewritten(path: &Path, text: &str) -> io::Result<()> {
    fs::write(path, text)
}

/// `apply_change` with the final write supplied by the caller
fn apply_change_with<W>(change: &FileChange, suffix: &str, write: W) -> ApplyOutcome
where
    W: FnOnce(&Path, &str) -> io::Result<()>,
{
    let backup = backup_path(&change.path, suffix);

    if let Err(e) = fs::copy(&change.path, &backup)
        .with_context(|| format!("failed to back up {}", change.path.display()))
    {
        debug!(file = %change.path.display(), error = %format!("{e:#}"), "backup failed");
        return ApplyOutcome::BackupFailed {
            reason: format!("{e:#}"),
        };
    }

    if let Err(e) = write(&change.path, &change.rewritten)
        .with_context(|| format!("failed to write {}", change.path.display()))
    {
        let restored = fs::copy(&backup, &change.path).is_ok();
        debug!(
            file = %change.path.display(),
            error = %format!("{e:#}"),
            restored,
            "write failed"
        );
        return ApplyOutcome::WriteFailed {
            reason: format!("{e:#}"),
            restored,
        };
    }

    debug!(file = %change.path.display(), backup = %backup.display(), "applied");
    ApplyOutcome::Applied { backup }
}

/// Move every backup under `root` back over its original
///
/// Only a failure to list `root` itself is an error; individual rename
/// failures are recorded in the outcomes and processing continues.
pub fn restore(root: &Path, suffix: &str) -> Result<Vec<RestoreOutcome>> {
    let backups = collect_backups(root, suffix)?;
    let mut outcomes = Vec::with_capacity(backups.len());

    for backup in backups {
        let Some(original) = original_path(&backup, suffix) else {
            continue;
        };
        let error = match fs::rename(&backup, &original) {
            Ok(()) => {
                debug!(file = %original.display(), "restored");
                None
            }
            Err(e) => {
                debug!(file = %original.display(), error = %e, "restore failed");
                Some(e.to_string())
            }
        };
        outcomes.push(RestoreOutcome {
            original,
            backup,
            error,
        });
    }

    Ok(outcomes)
}

/// Strip `suffix` from a backup path
fn original_path(backup: &Path, suffix: &str) -> Option<PathBuf> {
    let text = backup.to_str()?;
    let stripped = text.strip_suffix(suffix)?;
    (!stripped.is_empty()).then(|| PathBuf::from(stripped))
}
