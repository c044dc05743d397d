//! PHP tokenizer
//!
//! Produces a flat, lossless token stream: whitespace, comments and inline
//! HTML are tokens like everything else, so the stream can be copied back
//! out verbatim by the rewriter.
//!
//! Global invariants enforced:
//! - Concatenating every token's text reproduces the input byte-for-byte
//! - Tokenizing never fails; malformed input degrades to `Other` tokens or
//!   literals/comments that run to end of input
//! - Identical input yields identical tokens

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Text outside of `<?php ... ?>`
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    DocComment,
    /// Identifier or (qualified) name, e.g. `Foo`, `\Foo\Bar`, `namespace\Foo`
    Name,
    /// A function-introducing keyword (`function` or `fn`)
    Keyword,
    /// A parameter / property modifier keyword (`public`, `readonly`, ...)
    Modifier,
    /// `$name`
    Variable,
    /// Numbers and strings (quoted, backtick, heredoc, nowdoc)
    Literal,
    /// `#[`
    AttributeOpen,
    Punct,
    Other,
}

/// A single token borrowing its text from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    /// Whitespace and comments
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    /// True if this is the punctuation token `text`
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }
}

const FUNCTION_KEYWORDS: &[&str] = &["function", "fn"];

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "readonly",
    "var",
    "static",
    "final",
];

/// Operators longer than one byte, longest first so the first match wins
const MULTI_CHAR_PUNCT: &[&str] = &[
    "===", "!==", "<=>", "**=", "...", "<<=", ">>=", "??=", "?->", "==", "!=", "<>", "<=", ">=",
    "&&", "||", "??", "->", "=>", "::", "++", "--", "+=", "-=", "*=", "/=", ".=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**",
];

/// Tokenize PHP source text
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        in_php: false,
        last_significant: None,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    in_php: bool,
    /// Text of the last non-trivia token, used to classify words
    last_significant: Option<&'a str>,
    tokens: Vec<Token<'a>>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            if self.in_php {
                self.php_token();
            } else {
                self.inline_html();
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn push(&mut self, kind: TokenKind, end: usize) {
        let text = &self.src[self.pos..end];
        self.pos = end;
        if !matches!(
            kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        ) {
            self.last_significant = Some(text);
        }
        self.tokens.push(Token { kind, text });
    }

    fn inline_html(&mut self) {
        let rest = &self.bytes[self.pos..];
        match rest.windows(2).position(|w| w == b"<?") {
            Some(0) => {
                let tag_len = self.open_tag_len();
                self.in_php = true;
                self.push(TokenKind::OpenTag, self.pos + tag_len);
            }
            Some(offset) => self.push(TokenKind::InlineHtml, self.pos + offset),
            None => self.push(TokenKind::InlineHtml, self.bytes.len()),
        }
    }

    /// Length of the open tag at the cursor (`<?php`, `<?=` or `<?`)
    fn open_tag_len(&self) -> usize {
        let rest = &self.bytes[self.pos..];
        if rest.len() >= 5
            && rest[2..5].eq_ignore_ascii_case(b"php")
            && rest.get(5).map_or(true, |&b| is_space(b))
        {
            5
        } else if rest.get(2) == Some(&b'=') {
            3
        } else {
            2
        }
    }

    fn php_token(&mut self) {
        let b = self.bytes[self.pos];
        match b {
            _ if is_space(b) => {
                let end = self.scan_while(self.pos, is_space);
                self.push(TokenKind::Whitespace, end);
            }
            b'?' if self.peek(1) == Some(b'>') => {
                self.in_php = false;
                self.push(TokenKind::CloseTag, self.pos + 2);
            }
            b'#' if self.peek(1) == Some(b'[') => self.push(TokenKind::AttributeOpen, self.pos + 2),
            b'#' => self.line_comment(),
            b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
            b'/' if self.peek(1) == Some(b'*') => self.block_comment(),
            b'$' if self.peek(1).is_some_and(is_ident_start) => {
                let end = self.scan_while(self.pos + 1, is_ident_continue);
                self.push(TokenKind::Variable, end);
            }
            b'\\' if self.peek(1).is_some_and(is_ident_start) => self.name(),
            _ if is_ident_start(b) => self.name(),
            b'0'..=b'9' => self.number(),
            b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            b'\'' => {
                let end = self.quoted_end(self.pos + 1, b'\'', false);
                self.push(TokenKind::Literal, end);
            }
            b'"' | b'`' => {
                let end = self.quoted_end(self.pos + 1, b, true);
                self.push(TokenKind::Literal, end);
            }
            b'<' if self.starts_with("<<<") => match self.heredoc_end() {
                Some(end) => self.push(TokenKind::Literal, end),
                None => self.punct(),
            },
            _ if b.is_ascii_punctuation() => self.punct(),
            _ => self.push(TokenKind::Other, self.pos + 1),
        }
    }

    fn scan_while(&self, from: usize, pred: fn(u8) -> bool) -> usize {
        let mut end = from;
        while end < self.bytes.len() && pred(self.bytes[end]) {
            end += 1;
        }
        end
    }

    /// `//` and `#` comments end before a newline or a `?>`
    fn line_comment(&mut self) {
        let mut end = self.pos;
        while end < self.bytes.len() {
            match self.bytes[end] {
                b'\n' | b'\r' => break,
                b'?' if self.bytes.get(end + 1) == Some(&b'>') => break,
                _ => end += 1,
            }
        }
        self.push(TokenKind::Comment, end);
    }

    fn block_comment(&mut self) {
        let is_doc = self.starts_with("/**") && self.peek(3).is_some_and(is_space);
        let body = &self.bytes[self.pos + 2..];
        let end = match body.windows(2).position(|w| w == b"*/") {
            Some(offset) => self.pos + 2 + offset + 2,
            None => self.bytes.len(),
        };
        let kind = if is_doc {
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        };
        self.push(kind, end);
    }

    /// Identifiers and qualified names, classified into keyword kinds
    fn name(&mut self) {
        let mut end = self.pos;
        if self.bytes[end] == b'\\' {
            end += 1;
        }
        end = self.scan_while(end, is_ident_continue);
        while end + 1 < self.bytes.len()
            && self.bytes[end] == b'\\'
            && is_ident_start(self.bytes[end + 1])
        {
            end = self.scan_while(end + 1, is_ident_continue);
        }

        let text = &self.src[self.pos..end];
        let kind = self.classify_word(text);
        self.push(kind, end);
    }

    fn classify_word(&self, text: &str) -> TokenKind {
        // Member names and declared names are never keywords
        let after_member_access = matches!(self.last_significant, Some("->" | "?->" | "::"))
            || self.last_significant.is_some_and(|prev| {
                FUNCTION_KEYWORDS
                    .iter()
                    .any(|kw| prev.eq_ignore_ascii_case(kw))
            });
        if after_member_access || text.contains('\\') {
            return TokenKind::Name;
        }
        if FUNCTION_KEYWORDS
            .iter()
            .any(|kw| text.eq_ignore_ascii_case(kw))
        {
            TokenKind::Keyword
        } else if MODIFIERS.iter().any(|m| text.eq_ignore_ascii_case(m)) {
            TokenKind::Modifier
        } else {
            TokenKind::Name
        }
    }

    fn number(&mut self) {
        let is_hex = self.starts_with("0x") || self.starts_with("0X");
        let mut end = self.pos;
        while end < self.bytes.len() {
            let c = self.bytes[end];
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                end += 1;
            } else if !is_hex
                && (c == b'+' || c == b'-')
                && matches!(self.bytes[end - 1], b'e' | b'E')
                && self.bytes.get(end + 1).is_some_and(|d| d.is_ascii_digit())
            {
                end += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Literal, end);
    }

    /// End offset (exclusive) of a quoted literal whose body starts at `from`
    ///
    /// With `interpolates`, `{$ ... }` blocks are skipped as nested code so a
    /// quote inside an interpolated array key does not end the string.
    fn quoted_end(&self, from: usize, quote: u8, interpolates: bool) -> usize {
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                c if c == quote => return i + 1,
                b'{' if interpolates && self.bytes.get(i + 1) == Some(&b'$') => {
                    i = self.interpolation_end(i + 1);
                }
                _ => i += 1,
            }
        }
        self.bytes.len()
    }

    /// Skips a `{$ ... }` interpolation body starting just after the `{`
    fn interpolation_end(&self, from: usize) -> usize {
        let mut depth = 1usize;
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        return i;
                    }
                }
                q @ (b'\'' | b'"') => i = self.quoted_end(i + 1, q, q == b'"'),
                _ => i += 1,
            }
        }
        self.bytes.len()
    }

    /// End offset of a heredoc/nowdoc starting at the cursor, if well-formed
    fn heredoc_end(&self) -> Option<usize> {
        let mut i = self.pos + 3;
        while matches!(self.bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        let quote = match self.bytes.get(i) {
            Some(&q @ (b'\'' | b'"')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };
        if !self.bytes.get(i).copied().is_some_and(is_ident_start) {
            return None;
        }
        let label_start = i;
        i = self.scan_while(i, is_ident_continue);
        let label = &self.bytes[label_start..i];
        if let Some(q) = quote {
            if self.bytes.get(i) != Some(&q) {
                return None;
            }
            i += 1;
        }
        match self.bytes.get(i) {
            Some(b'\n') => i += 1,
            Some(b'\r') => {
                i += 1;
                if self.bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => return None,
        }

        // Find a line whose first non-blank text is the label
        loop {
            let mut j = i;
            while matches!(self.bytes.get(j), Some(b' ' | b'\t')) {
                j += 1;
            }
            if self.bytes[j..].starts_with(label)
                && !self
                    .bytes
                    .get(j + label.len())
                    .copied()
                    .is_some_and(is_ident_continue)
            {
                return Some(j + label.len());
            }
            match self.bytes[i..].iter().position(|&c| c == b'\n') {
                Some(offset) => i += offset + 1,
                None => return Some(self.bytes.len()),
            }
        }
    }

    fn punct(&mut self) {
        let len = MULTI_CHAR_PUNCT
            .iter()
            .find(|op| self.starts_with(op))
            .map_or(1, |op| op.len());
        self.push(TokenKind::Punct, self.pos + len);
    }
}
