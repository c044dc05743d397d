//! Function parameter-list discovery and segmentation
//!
//! Both the detection pass and the rewrite pass go through
//! [`parameter_lists`], so the coordinates one pass records are exactly the
//! coordinates the other pass finds.
//!
//! Global invariants enforced:
//! - Function occurrences are numbered in left-to-right keyword order
//! - Identical token streams yield identical lists, indices and ranges
//! - A parameter carrying an attribute is always flagged

use crate::lexer::{Token, TokenKind};
use std::ops::Range;

/// Parameter list of one function occurrence
///
/// All ranges index into the token slice the list was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamList {
    /// Zero-based occurrence index within the file
    pub function_index: usize,
    /// Token index of the opening `(`
    pub open: usize,
    /// Token index of the matching `)`
    pub close: usize,
    /// One token range per parameter, in declaration order
    pub params: Vec<Range<usize>>,
}

/// A parameter span split into its leading and body regions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRegions {
    /// Whitespace, comments and attributes before the declaration
    pub leading: Range<usize>,
    /// Modifiers, type, markers, variable and default value
    pub body: Range<usize>,
    pub has_attribute: bool,
}

/// Find every function parameter list in a token stream
///
/// A function occurrence is a `function`/`fn` keyword followed by an
/// optional `&`, an optional name, and a `(` with a matching `)`. Scanning
/// resumes right after each keyword, so closures inside bodies are found
/// as occurrences of their own.
pub fn parameter_lists(tokens: &[Token<'_>]) -> Vec<ParamList> {
    let mut lists = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Keyword {
            continue;
        }
        let Some(open) = find_open_paren(tokens, i + 1) else {
            continue;
        };
        let Some(close) = matching_paren(tokens, open) else {
            continue;
        };
        lists.push(ParamList {
            function_index: lists.len(),
            open,
            close,
            params: split_parameters(tokens, open + 1..close),
        });
    }
    lists
}

/// Index of the first non-trivia token at or after `from`
fn skip_trivia(tokens: &[Token<'_>], from: usize) -> usize {
    let mut i = from;
    while i < tokens.len() && tokens[i].is_trivia() {
        i += 1;
    }
    i
}

fn find_open_paren(tokens: &[Token<'_>], from: usize) -> Option<usize> {
    let mut i = skip_trivia(tokens, from);
    if tokens.get(i)?.is_punct("&") {
        i = skip_trivia(tokens, i + 1);
    }
    if tokens.get(i)?.kind == TokenKind::Name {
        i = skip_trivia(tokens, i + 1);
    }
    tokens.get(i)?.is_punct("(").then_some(i)
}

fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split the tokens between a list's parentheses into parameter spans
///
/// Commas only separate parameters at nesting depth zero; `(`, `[`, `{`
/// and `#[` all open a nesting level so commas inside default values and
/// attribute arguments stay in their parameter. A trailing empty span is
/// dropped.
pub fn split_parameters(tokens: &[Token<'_>], inner: Range<usize>) -> Vec<Range<usize>> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut start = inner.start;
    for i in inner.clone() {
        let token = &tokens[i];
        if token.kind == TokenKind::AttributeOpen {
            depth += 1;
            continue;
        }
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "," if depth == 0 => {
                params.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < inner.end {
        params.push(start..inner.end);
    }
    params
}

/// Separate a parameter's leading trivia and attributes from its body
///
/// Attribute groups (`#[ ... ]`) are consumed with bracket-depth tracking.
/// An unterminated group swallows the rest of the parameter. The result is
/// flagged `has_attribute` whenever a `#[` appears anywhere in the
/// parameter, so ambiguous layouts are always skipped.
pub fn split_leading(tokens: &[Token<'_>], param: Range<usize>) -> ParamRegions {
    let end = param.end;
    let mut i = param.start;
    loop {
        i = skip_trivia(tokens, i).min(end);
        if i >= end || tokens[i].kind != TokenKind::AttributeOpen {
            break;
        }
        i = attribute_end(tokens, i, end);
    }

    let has_attribute = tokens[param.clone()]
        .iter()
        .any(|t| t.kind == TokenKind::AttributeOpen);

    ParamRegions {
        leading: param.start..i,
        body: i..end,
        has_attribute,
    }
}

/// Index just past the `]` closing the attribute group opened at `open`
fn attribute_end(tokens: &[Token<'_>], open: usize, end: usize) -> usize {
    let mut depth = 1usize;
    let mut i = open + 1;
    while i < end {
        let token = &tokens[i];
        if token.kind == TokenKind::AttributeOpen || token.is_punct("[") {
            depth += 1;
        } else if token.is_punct("]") {
            depth -= 1;
            if depth == 0 {
                return i + 1;
            }
        }
        i += 1;
    }
    end
}
