//! Implicit-nullable parameter detection
//!
//! A candidate is a parameter that declares a concrete type and a literal
//! `null` default without saying so in its type, e.g. `Foo $a = null`.
//!
//! Global invariants enforced:
//! - Detection is a pure function of the token stream
//! - Attribute-decorated parameters are never candidates
//! - Issues come out in (function index, parameter index) order

use crate::lexer::{tokenize, Token, TokenKind};
use crate::params::{parameter_lists, split_leading, ParamRegions};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// The top type, which already admits null
const TOP_TYPE: &str = "mixed";

/// Type annotation location within a parameter body
///
/// Offsets index into the body slice, not into the file's token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpan {
    pub start: usize,
    /// Exclusive; whitespace between type and variable is included
    pub end: usize,
}

/// A parameter that passed every detection check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub regions: ParamRegions,
    pub span: TypeSpan,
    /// Trimmed source text of the type
    pub type_name: String,
}

/// An implicitly nullable parameter found in a file
///
/// `function_index`, `param_index` and `type_start` address the parameter
/// and are only valid while the file's text is unchanged; the remaining
/// fields are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub file: PathBuf,
    pub function_index: usize,
    pub param_index: usize,
    /// Offset of the first type token within the parameter body
    pub type_start: usize,
    /// 1-based line of the first type token
    pub line: u32,
    pub parameter: String,
    pub type_name: String,
}

fn plain_identifier_re() -> &'static Regex {
    static IDENT_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    IDENT_RE.get_or_init(|| Regex::new(r"^[A-Za-z_\\][A-Za-z0-9_\\]*$").unwrap())
}

/// Locate the type annotation in a parameter body
///
/// Returns `None` when the body has no variable or nothing type-like
/// precedes it.
pub fn locate_type(body: &[Token<'_>]) -> Option<TypeSpan> {
    let var_idx = body.iter().position(|t| t.kind == TokenKind::Variable)?;

    let start = (0..var_idx).find(|&m| {
        let token = &body[m];
        !token.is_trivia()
            && token.kind != TokenKind::Modifier
            && !matches!(token.text, "&" | "..." | "(" | ")" | ",")
            && is_type_start(token)
    })?;

    let end = (start..var_idx)
        .find(|&k| {
            is_reference_marker(body, k)
                || body[k].is_punct("...")
                || body[k].kind == TokenKind::Modifier
        })
        .unwrap_or(var_idx);

    Some(TypeSpan { start, end })
}

fn is_type_start(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Name
        || token.text == "?"
        || token.text == "\\"
        || plain_identifier_re().is_match(token.text)
}

/// `&` directly before the variable (or a variadic marker), as opposed to
/// an intersection-type `&`
pub(crate) fn is_reference_marker(body: &[Token<'_>], idx: usize) -> bool {
    if !body[idx].is_punct("&") {
        return false;
    }
    body[idx + 1..]
        .iter()
        .find(|t| !t.is_trivia())
        .is_some_and(|t| t.kind == TokenKind::Variable || t.is_punct("..."))
}

/// True if the first significant token after the variable's `=` is `null`
fn has_null_default(body: &[Token<'_>]) -> bool {
    let Some(var_idx) = body.iter().position(|t| t.kind == TokenKind::Variable) else {
        return false;
    };
    let Some(eq) = (var_idx + 1..body.len()).find(|&i| body[i].is_punct("=")) else {
        return false;
    };
    body[eq + 1..]
        .iter()
        .find(|t| !t.is_trivia())
        .is_some_and(|t| is_null_literal(t.text))
}

fn is_null_literal(text: &str) -> bool {
    let text = text.strip_prefix('\\').unwrap_or(text);
    text.eq_ignore_ascii_case("null")
}

/// Types that are already explicitly nullable or cannot take a `?` prefix
fn is_fixable_type(type_name: &str) -> bool {
    !(type_name.is_empty()
        || type_name.starts_with('?')
        || type_name.contains('|')
        || type_name.contains('&')
        || type_name.eq_ignore_ascii_case(TOP_TYPE)
        || is_null_literal(type_name))
}

/// Run every detection check against one parameter span
pub fn inspect_parameter(tokens: &[Token<'_>], param: Range<usize>) -> Option<Accepted> {
    let regions = split_leading(tokens, param);
    if regions.has_attribute {
        return None;
    }

    let body = &tokens[regions.body.clone()];
    if body.is_empty() || !has_null_default(body) {
        return None;
    }

    let span = locate_type(body)?;
    let type_text: String = body[span.start..span.end].iter().map(|t| t.text).collect();
    let type_name = type_text.trim();
    if !is_fixable_type(type_name) {
        return None;
    }

    Some(Accepted {
        span,
        type_name: type_name.to_string(),
        regions,
    })
}

/// Find implicitly nullable parameters in a token stream
pub fn find_issues(file: &Path, tokens: &[Token<'_>]) -> Vec<Issue> {
    let line_starts = token_lines(tokens);
    let mut issues = Vec::new();

    for list in parameter_lists(tokens) {
        for (param_index, param) in list.params.iter().enumerate() {
            let Some(accepted) = inspect_parameter(tokens, param.clone()) else {
                continue;
            };
            let body = &tokens[accepted.regions.body.clone()];
            let parameter = body
                .iter()
                .find(|t| t.kind == TokenKind::Variable)
                .map(|t| t.text.to_string())
                .unwrap_or_default();

            issues.push(Issue {
                file: file.to_path_buf(),
                function_index: list.function_index,
                param_index,
                type_start: accepted.span.start,
                line: line_starts[accepted.regions.body.start + accepted.span.start],
                parameter,
                type_name: accepted.type_name,
            });
        }
    }

    issues
}

/// Tokenize and scan one file's source text
pub fn scan_source(file: &Path, src: &str) -> Vec<Issue> {
    let tokens = tokenize(src);
    find_issues(file, &tokens)
}

/// 1-based starting line of every token
fn token_lines(tokens: &[Token<'_>]) -> Vec<u32> {
    let mut line = 1u32;
    tokens
        .iter()
        .map(|t| {
            let start = line;
            line += t.text.matches('\n').count() as u32;
            start
        })
        .collect()
}
