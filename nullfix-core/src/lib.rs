//! nullfix core library - finds and rewrites implicitly nullable PHP parameters

// Global invariants enforced in this crate:
// - Detection and rewriting share one function/parameter scanner
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Files are processed one at a time in sorted path order
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod detect;
pub mod discover;
pub mod lexer;
pub mod params;
pub mod patch;
pub mod report;
pub mod rewrite;

pub use config::{load_and_resolve, Overrides, ResolvedConfig};
pub use detect::Issue;
pub use patch::{ApplyOutcome, FileChange, Mode, RestoreOutcome};
pub use report::{render_json, render_text};
pub use rewrite::{RewritePlan, RewriteStyle};

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning a tree
#[derive(Debug, Default)]
pub struct ScanReport {
    pub files_scanned: usize,
    /// Issues in (file, function index, parameter index) order
    pub issues: Vec<Issue>,
    /// Files that could not be read as UTF-8 text
    pub skipped: Vec<FileFailure>,
}

impl ScanReport {
    pub fn plan(&self) -> RewritePlan {
        RewritePlan::from_issues(&self.issues)
    }
}

/// Scan every selected file under `root` for implicitly nullable parameters
///
/// Fails only when `root` is not a readable directory; unreadable files are
/// recorded in `skipped`.
pub fn scan(root: &Path, config: &ResolvedConfig) -> Result<ScanReport> {
    discover::validate_root(root)?;
    let files = discover::collect_files(root, config)?;

    let mut report = ScanReport::default();
    for path in files {
        let src = match std::fs::read_to_string(&path) {
            Ok(src) => src,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "cannot read file");
                report.skipped.push(FileFailure {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let issues = detect::scan_source(&path, &src);
        debug!(file = %path.display(), issues = issues.len(), "scanned");
        report.issues.extend(issues);
        report.files_scanned += 1;
    }

    Ok(report)
}

/// Restore every backup under `root`
pub fn restore(root: &Path, suffix: &str) -> Result<Vec<RestoreOutcome>> {
    discover::validate_root(root)?;
    patch::restore(root, suffix)
}
