//! Candidate listing output
//!
//! Global invariants enforced:
//! - Issues are printed in the order detection produced them
//! - Byte-for-byte identical output across runs

use crate::detect::Issue;
use anyhow::{Context, Result};

/// Message printed when a scan finds nothing
pub const NOTHING_FOUND: &str = "No implicit-nullable typed parameters found.";

/// Render issues as human-readable text
///
/// Numbering is 1-based and runs across all files.
pub fn render_text(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return format!("{}\n", NOTHING_FOUND);
    }

    let mut output = format!("Found {} candidate(s):\n", issues.len());
    for (n, issue) in issues.iter().enumerate() {
        output.push_str("---\n");
        output.push_str(&format!(
            "#{}: {}  function-occurrence: {}  param-index: {}  typeStartInBody: {}\n",
            n + 1,
            issue.file.display(),
            issue.function_index,
            issue.param_index,
            issue.type_start
        ));
        output.push_str(&format!(
            "    line {}: {} {}\n",
            issue.line, issue.type_name, issue.parameter
        ));
    }
    output
}

/// Render issues as a pretty-printed JSON array
pub fn render_json(issues: &[Issue]) -> Result<String> {
    serde_json::to_string_pretty(issues).context("failed to serialize issues as JSON")
}
