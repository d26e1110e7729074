//! Lexer: tokenizer configuration, line splitting and a per-line cursor.
//!
//! Newlines are structural: the input is split into [`Line`]s up front and
//! every grammar rule works on one line at a time through a [`Cursor`].
//! Only the characters listed in [`TokenizerConfig`] count as skippable
//! whitespace inside a line.

use serde::{Deserialize, Serialize};

/// Symbols allowed in body lines besides ASCII letters and digits.
pub const DEFAULT_BODY_SYMBOLS: &str = "-'\\/[]_=+!@£$%^&*().:,";

/// What to do with a body line containing a character outside the symbol set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSymbolPolicy {
    /// Keep the line and report a [`super::model::SymbolWarning`]
    #[default]
    Warn,
    /// Fail the parse with [`super::model::ParseError::UnrecognizedSymbol`]
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerConfig {
    whitespace: Vec<char>,
    body_symbols: Vec<char>,
    unknown_symbols: UnknownSymbolPolicy,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            whitespace: vec![' ', '\t'],
            body_symbols: DEFAULT_BODY_SYMBOLS.chars().collect(),
            unknown_symbols: UnknownSymbolPolicy::Warn,
        }
    }
}

impl TokenizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the body symbol set. Duplicates are ignored.
    pub fn with_extra_symbols(mut self, extra: &str) -> Self {
        for c in extra.chars() {
            if !self.body_symbols.contains(&c) {
                self.body_symbols.push(c);
            }
        }
        self
    }

    pub fn with_unknown_symbols(mut self, policy: UnknownSymbolPolicy) -> Self {
        self.unknown_symbols = policy;
        self
    }

    pub fn unknown_symbols(&self) -> UnknownSymbolPolicy {
        self.unknown_symbols
    }

    pub fn is_whitespace(&self, c: char) -> bool {
        self.whitespace.contains(&c)
    }

    pub fn is_body_char(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.body_symbols.contains(&c)
    }

    /// A line made only of whitespace (or nothing).
    pub fn is_blank(&self, text: &str) -> bool {
        text.chars().all(|c| self.is_whitespace(c))
    }

    pub fn trim<'a>(&self, text: &'a str) -> &'a str {
        text.trim_matches(|c| self.is_whitespace(c))
    }
}

/// One physical line of the input, without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based
    pub number: usize,
    pub text: &'a str,
}

/// Split on `\n`, dropping a trailing `\r` from each line.
///
/// Text after the last newline is kept as a final (possibly empty) line, so
/// input ending in `\n` always yields a trailing blank line.
pub fn split_lines(input: &str) -> Vec<Line<'_>> {
    input
        .split('\n')
        .enumerate()
        .map(|(idx, raw)| Line {
            number: idx + 1,
            text: raw.strip_suffix('\r').unwrap_or(raw),
        })
        .collect()
}

/// Forward-only scanner over a single line.
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    config: &'a TokenizerConfig,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str, config: &'a TokenizerConfig) -> Self {
        Self { text, pos: 0, config }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip configured whitespace; returns the number of bytes skipped.
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !self.config.is_whitespace(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos - start
    }

    /// Consume the longest non-empty run of characters matching `pred`.
    /// Does not skip leading whitespace.
    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos == start {
            None
        } else {
            Some(&self.text[start..self.pos])
        }
    }

    pub fn eat(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    /// True when only whitespace remains. Consumes that whitespace.
    pub fn at_line_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos == self.text.len()
    }
}

pub(crate) fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub(crate) fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub(crate) fn is_alphanumeric(c: char) -> bool {
    c.is_ascii_alphanumeric()
}
