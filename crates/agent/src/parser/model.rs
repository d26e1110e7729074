use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Grammar rule that rejected the input, reported in [`ParseError::GrammarMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `<date> <time><segment><label words>: <mrn>-`
    Header,
    /// Free text made of word characters and the allowed symbol set
    Body,
    /// Blank lines closing a record
    Terminator,
    /// Whole-file rule (one or more records)
    Log,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Header => "header line",
            Rule::Body => "body line",
            Rule::Terminator => "record terminator",
            Rule::Log => "log",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {rule} mismatch: {detail}")]
    GrammarMismatch {
        line: usize,
        rule: Rule,
        detail: String,
    },

    #[error("line {line}: invalid timestamp '{value}': {reason}")]
    TimestampFormat {
        line: usize,
        value: String,
        reason: String,
    },

    #[error("line {line}: unrecognized symbol {symbol:?} in body line")]
    UnrecognizedSymbol { line: usize, symbol: char },
}

impl ParseError {
    pub fn mismatch(line: usize, rule: Rule, detail: impl Into<String>) -> Self {
        Self::GrammarMismatch {
            line,
            rule,
            detail: detail.into(),
        }
    }

    /// 1-based line number the error points at.
    pub fn line(&self) -> usize {
        match self {
            ParseError::GrammarMismatch { line, .. }
            | ParseError::TimestampFormat { line, .. }
            | ParseError::UnrecognizedSymbol { line, .. } => *line,
        }
    }
}

/// Parsed record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub line: usize,
    pub timestamp: NaiveDateTime,
    /// Message type, e.g. `A05`
    pub segment_code: String,
    /// First digit group before the hyphen
    pub patient_mrn: String,
}

/// Body line with characters outside the configured symbol set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolWarning {
    pub line: usize,
    /// Distinct offending characters, in order of first appearance
    pub symbols: Vec<char>,
}

impl fmt::Display for SymbolWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: unrecognized symbols {:?}", self.line, self.symbols)
    }
}

/// One body line after whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLine {
    pub text: String,
    pub warning: Option<SymbolWarning>,
}

/// One timestamped entry of the error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Line number of the header
    pub line: usize,
    pub timestamp: NaiveDateTime,
    pub segment_code: String,
    pub patient_mrn: String,
    /// Content lines in file order; never empty
    pub body_lines: Vec<String>,
    /// Merge blocks inside the body span (not content)
    pub merge_blocks: usize,
}

impl LogRecord {
    pub fn first_body_line(&self) -> Option<&str> {
        self.body_lines.first().map(String::as_str)
    }
}

/// Result of parsing a whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogDocument {
    pub records: Vec<LogRecord>,
    pub warnings: Vec<SymbolWarning>,
}

/// A missing consultant C-code found in a monitored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub consultant_code: String,
    pub patient_mrn: String,
    pub category: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Galaxy C-Code Missing: {} for Patient MRN: {} ({})",
            self.consultant_code, self.patient_mrn, self.category
        )
    }
}
