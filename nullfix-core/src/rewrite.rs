//! Rewrite planning and application
//!
//! The rewriter never reuses token spans from the detection pass. It
//! re-tokenizes the unmodified source, re-derives every parameter through
//! the same discovery and detection code, and only then inserts the
//! nullable notation at the recorded coordinates.
//!
//! Global invariants enforced:
//! - Text outside the inserted notation is copied through verbatim
//! - A plan entry that no longer matches a fixable parameter is ignored
//! - Rewriting already-rewritten text is a no-op

use crate::detect::{inspect_parameter, is_reference_marker, Issue};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::params::parameter_lists;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// How an implicitly nullable type is made explicit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteStyle {
    /// `Foo $a = null` becomes `?Foo $a = null`
    #[default]
    Mark,
    /// `Foo $a = null` becomes `Foo|null $a = null`
    Union,
}

impl RewriteStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteStyle::Mark => "mark",
            RewriteStyle::Union => "union",
        }
    }
}

/// function index -> (parameter index -> type start offset)
pub type FilePlan = BTreeMap<usize, BTreeMap<usize, usize>>;

/// Per-file rewrite targets built from detected issues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePlan {
    files: BTreeMap<PathBuf, FilePlan>,
}

impl RewritePlan {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut files: BTreeMap<PathBuf, FilePlan> = BTreeMap::new();
        for issue in issues {
            files
                .entry(issue.file.clone())
                .or_default()
                .entry(issue.function_index)
                .or_default()
                .insert(issue.param_index, issue.type_start);
        }
        RewritePlan { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of files with at least one target
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file(&self, path: &Path) -> Option<&FilePlan> {
        self.files.get(path)
    }

    /// Files in sorted path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &FilePlan)> {
        self.files.iter()
    }
}

/// Text inserted before a token index
struct Insertion {
    before: usize,
    text: &'static str,
}

/// Rewrite one file's source according to its plan
///
/// Returns the complete replacement text. If no plan entry still applies
/// the result is identical to `src`.
pub fn rewrite_source(src: &str, plan: &FilePlan, style: RewriteStyle) -> String {
    let tokens = tokenize(src);
    let mut insertions: Vec<Insertion> = Vec::new();

    for list in parameter_lists(&tokens) {
        let Some(targets) = plan.get(&list.function_index) else {
            continue;
        };
        for (param_index, &type_start) in targets {
            let Some(param) = list.params.get(*param_index) else {
                continue;
            };
            if let Some(insertion) = plan_insertion(&tokens, param.clone(), type_start, style) {
                insertions.push(insertion);
            }
        }
    }

    if insertions.is_empty() {
        return src.to_string();
    }
    insertions.sort_by_key(|ins| ins.before);
    insertions.dedup_by_key(|ins| ins.before);

    let mut out = String::with_capacity(src.len() + insertions.len() * "|null".len());
    let mut pending = insertions.iter().peekable();
    for (i, token) in tokens.iter().enumerate() {
        while let Some(ins) = pending.next_if(|ins| ins.before == i) {
            out.push_str(ins.text);
        }
        out.push_str(token.text);
    }
    out
}

/// Re-validate one planned parameter and decide where to insert
fn plan_insertion(
    tokens: &[Token<'_>],
    param: Range<usize>,
    type_start: usize,
    style: RewriteStyle,
) -> Option<Insertion> {
    let accepted = inspect_parameter(tokens, param)?;
    let body_start = accepted.regions.body.start;
    let body = &tokens[accepted.regions.body.clone()];

    if accepted.regions.has_attribute
        || accepted.span.start != type_start
        || type_start >= body.len()
        || body[type_start].text.starts_with('?')
    {
        return None;
    }

    match style {
        RewriteStyle::Mark => Some(Insertion {
            before: body_start + type_start,
            text: "?",
        }),
        RewriteStyle::Union => {
            let last = last_type_token(body, type_start)?;
            let already_nullable = body[type_start..=last]
                .iter()
                .any(|t| t.text.contains('|') || is_null_word(t));
            if already_nullable {
                return None;
            }
            Some(Insertion {
                before: body_start + last + 1,
                text: "|null",
            })
        }
    }
}

/// Last token of the type, walking back from the variable over trivia and
/// reference/variadic markers
fn last_type_token(body: &[Token<'_>], type_start: usize) -> Option<usize> {
    let var_idx = body.iter().position(|t| t.kind == TokenKind::Variable)?;
    let mut idx = var_idx.checked_sub(1)?;
    while idx > type_start
        && (body[idx].is_trivia() || body[idx].is_punct("...") || is_reference_marker(body, idx))
    {
        idx -= 1;
    }
    (idx >= type_start).then_some(idx)
}

/// A name segment spelled `null` in any case
fn is_null_word(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Name
        && token
            .text
            .rsplit('\\')
            .next()
            .is_some_and(|segment| segment.eq_ignore_ascii_case("null"))
}
