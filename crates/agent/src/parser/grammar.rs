//! Grammar: recursive-descent rules over the lines of a Galaxy error log.
//!
//! ```text
//! log        := record+
//! record     := header body+ blank+
//! header     := DD-Mon-YY SP HH:MM:SS[:] segment word+ ':' digits+ '-'
//! body       := body_line merge_block*
//! merge      := blank "***End of Merge Message(s)***" blank
//! ```
//!
//! Each rule is a public function so it can be exercised on its own.
//! Every rule except `merge` is mandatory: a mismatch aborts the whole file.

use chrono::NaiveDateTime;

use super::lexer::{is_digit, is_letter, split_lines, Cursor, Line, TokenizerConfig, UnknownSymbolPolicy};
use super::model::{BodyLine, Header, LogDocument, LogRecord, ParseError, Rule, SymbolWarning};

pub const MERGE_MARKER: &str = "***End of Merge Message(s)***";

/// Lines consumed by one merge block: blank, marker, blank.
pub const MERGE_BLOCK_LINES: usize = 3;

const TIMESTAMP_FORMAT: &str = "%d-%b-%y %H:%M:%S";

/// Parse a record header, e.g. `14-Sep-15 09:35:01A05 for Patient: 654321-`.
///
/// The header must start in the first column. A lexically valid date/time
/// that fails calendar validation is a [`ParseError::TimestampFormat`].
pub fn parse_header_line(line: &Line<'_>, config: &TokenizerConfig) -> Result<Header, ParseError> {
    let mismatch = |detail: &str| ParseError::mismatch(line.number, Rule::Header, detail);
    let mut cursor = Cursor::new(line.text, config);

    // Date and time are one combined token: no whitespace skipping inside.
    let stamp_start = cursor.position();
    cursor
        .take_while(is_digit)
        .ok_or_else(|| mismatch("expected day digits at start of line"))?;
    if !cursor.eat('-') {
        return Err(mismatch("expected '-' after day"));
    }
    let month = cursor
        .take_while(is_letter)
        .ok_or_else(|| mismatch("expected month name"))?;
    if !cursor.eat('-') {
        return Err(mismatch("expected '-' after month"));
    }
    cursor
        .take_while(is_digit)
        .ok_or_else(|| mismatch("expected year digits"))?;
    if !cursor.eat(' ') {
        return Err(mismatch("expected a single space between date and time"));
    }
    for (idx, part) in ["hours", "minutes", "seconds"].iter().enumerate() {
        if idx > 0 && !cursor.eat(':') {
            return Err(mismatch(&format!("expected ':' before {}", part)));
        }
        cursor
            .take_while(is_digit)
            .ok_or_else(|| mismatch(&format!("expected {} digits", part)))?;
    }
    let stamp = cursor.slice(stamp_start, cursor.position());
    cursor.eat(':');

    let timestamp = parse_timestamp(line.number, stamp, month)?;

    // Segment code: letters immediately followed by digits (A05).
    cursor.skip_whitespace();
    let segment_start = cursor.position();
    cursor
        .take_while(is_letter)
        .ok_or_else(|| mismatch("expected segment code after timestamp"))?;
    cursor
        .take_while(is_digit)
        .ok_or_else(|| mismatch("segment code must end in digits"))?;
    let segment_code = cursor.slice(segment_start, cursor.position()).to_string();

    // Free-text label ("for Patient:"), discarded.
    let mut label_words = 0;
    loop {
        cursor.skip_whitespace();
        if cursor.take_while(is_letter).is_none() {
            break;
        }
        label_words += 1;
    }
    if label_words == 0 {
        return Err(mismatch("expected label words after segment code"));
    }
    if !cursor.eat(':') {
        return Err(mismatch("expected ':' after label"));
    }

    let mut mrn_groups = Vec::new();
    loop {
        cursor.skip_whitespace();
        match cursor.take_while(is_digit) {
            Some(group) => mrn_groups.push(group),
            None => break,
        }
    }
    let patient_mrn = mrn_groups
        .first()
        .ok_or_else(|| mismatch("expected patient MRN digits"))?
        .to_string();
    if !cursor.eat('-') {
        return Err(mismatch("expected '-' after patient MRN"));
    }
    if !cursor.at_line_end() {
        return Err(mismatch("unexpected text after patient MRN"));
    }

    Ok(Header {
        line: line.number,
        timestamp,
        segment_code,
        patient_mrn,
    })
}

fn parse_timestamp(line: usize, stamp: &str, month: &str) -> Result<NaiveDateTime, ParseError> {
    let invalid = |reason: String| ParseError::TimestampFormat {
        line,
        value: stamp.to_string(),
        reason,
    };
    if month.len() != 3 {
        return Err(invalid(format!("month '{}' is not a three-letter abbreviation", month)));
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|e| invalid(e.to_string()))
}

/// Parse one body line. Blank lines never match.
///
/// Characters outside the configured symbol set produce a warning or an
/// error depending on [`TokenizerConfig::unknown_symbols`].
pub fn parse_body_line(line: &Line<'_>, config: &TokenizerConfig) -> Result<BodyLine, ParseError> {
    let text = config.trim(line.text);
    if text.is_empty() {
        return Err(ParseError::mismatch(line.number, Rule::Body, "expected a body line, found a blank line"));
    }

    let mut unknown: Vec<char> = Vec::new();
    for c in text.chars() {
        if !config.is_whitespace(c) && !config.is_body_char(c) && !unknown.contains(&c) {
            unknown.push(c);
        }
    }

    let warning = match (unknown.first().copied(), config.unknown_symbols()) {
        (None, _) => None,
        (Some(symbol), UnknownSymbolPolicy::Reject) => {
            return Err(ParseError::UnrecognizedSymbol { line: line.number, symbol });
        }
        (Some(_), UnknownSymbolPolicy::Warn) => Some(SymbolWarning {
            line: line.number,
            symbols: unknown,
        }),
    };

    Ok(BodyLine {
        text: text.to_string(),
        warning,
    })
}

/// Match a merge block at the start of `lines`.
///
/// Returns the number of lines consumed, or `None` when the block is absent.
pub fn parse_merge_block(lines: &[Line<'_>], config: &TokenizerConfig) -> Option<usize> {
    match lines {
        [first, marker, last, ..]
            if config.is_blank(first.text)
                && config.trim(marker.text) == MERGE_MARKER
                && config.is_blank(last.text) =>
        {
            Some(MERGE_BLOCK_LINES)
        }
        _ => None,
    }
}

/// Parse one record starting at `lines[0]`.
///
/// Body lines are consumed greedily until a blank line that does not open a
/// merge block; a header-shaped line without a blank line before it is
/// therefore a body line. Returns the record and the number of lines used,
/// including the blank terminator lines.
pub fn parse_record(
    lines: &[Line<'_>],
    config: &TokenizerConfig,
    warnings: &mut Vec<SymbolWarning>,
) -> Result<(LogRecord, usize), ParseError> {
    let first = lines
        .first()
        .ok_or_else(|| ParseError::mismatch(0, Rule::Header, "expected a record header, found end of input"))?;
    let header = parse_header_line(first, config)?;

    let mut pos = 1;
    let mut body_lines = Vec::new();
    let mut merge_blocks = 0;
    while let Some(line) = lines.get(pos) {
        if config.is_blank(line.text) {
            break;
        }
        let body = parse_body_line(line, config)?;
        if let Some(warning) = body.warning {
            warnings.push(warning);
        }
        body_lines.push(body.text);
        pos += 1;

        while let Some(consumed) = parse_merge_block(&lines[pos..], config) {
            merge_blocks += 1;
            pos += consumed;
        }
    }

    if body_lines.is_empty() {
        return Err(ParseError::mismatch(
            header.line + 1,
            Rule::Body,
            "record header is not followed by a body line",
        ));
    }

    let terminator_start = pos;
    while lines.get(pos).is_some_and(|line| config.is_blank(line.text)) {
        pos += 1;
    }
    if pos == terminator_start {
        let last = lines.last().map_or(header.line, |line| line.number);
        return Err(ParseError::mismatch(
            last,
            Rule::Terminator,
            "record is not followed by a blank line (missing trailing newline?)",
        ));
    }

    let record = LogRecord {
        line: header.line,
        timestamp: header.timestamp,
        segment_code: header.segment_code,
        patient_mrn: header.patient_mrn,
        body_lines,
        merge_blocks,
    };
    Ok((record, pos))
}

/// Parse a complete log file. All-or-nothing: the first mismatch is returned
/// and no records are produced.
pub fn parse_log(input: &str, config: &TokenizerConfig) -> Result<LogDocument, ParseError> {
    if config.is_blank(input.trim_matches(|c| c == '\n' || c == '\r')) {
        return Err(ParseError::mismatch(1, Rule::Log, "log contains no records"));
    }

    let lines = split_lines(input);
    let mut document = LogDocument::default();
    let mut pos = 0;
    while pos < lines.len() {
        let (record, consumed) = parse_record(&lines[pos..], config, &mut document.warnings)?;
        document.records.push(record);
        pos += consumed;
    }
    Ok(document)
}
