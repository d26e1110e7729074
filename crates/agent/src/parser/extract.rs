//! Extract: monitored-segment filtering and consultant code extraction.
//!
//! Unlike the record grammar, the consultant pattern is optional: a first
//! body line that does not match simply yields no alert.

use super::grammar::parse_log;
use super::lexer::{is_alphanumeric, is_letter, Cursor, TokenizerConfig};
use super::model::{Alert, LogRecord, ParseError, SymbolWarning};

/// General admission notifications; never monitored.
pub const EXCLUDED_SEGMENT_CODE: &str = "A01";

/// Which records raise alerts and how they are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRule {
    pub segment_code: String,
    pub category: String,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            segment_code: "A05".to_string(),
            category: "Access Plan Entry".to_string(),
        }
    }
}

impl AlertRule {
    pub fn matches(&self, record: &LogRecord) -> bool {
        record.segment_code == self.segment_code && record.segment_code != EXCLUDED_SEGMENT_CODE
    }
}

/// Everything the parser needs for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub tokenizer: TokenizerConfig,
    pub rule: AlertRule,
}

/// Outcome of scanning one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub records: usize,
    pub alerts: Vec<Alert>,
    pub warnings: Vec<SymbolWarning>,
}

/// Match `word* '[' code ']' word+ '.'*` at the start of `line` and return
/// the code.
///
/// Words are ASCII letters. Text after the trailing periods is ignored
/// unless it holds a second bracketed code, in which case the line is
/// ambiguous and nothing is returned.
pub fn match_consultant_code(line: &str, config: &TokenizerConfig) -> Option<String> {
    let mut cursor = Cursor::new(line, config);

    loop {
        cursor.skip_whitespace();
        if cursor.take_while(is_letter).is_none() {
            break;
        }
    }

    if !cursor.eat('[') {
        return None;
    }
    cursor.skip_whitespace();
    let code = cursor.take_while(is_alphanumeric)?;
    cursor.skip_whitespace();
    if !cursor.eat(']') {
        return None;
    }

    let mut trailing_words = 0;
    loop {
        cursor.skip_whitespace();
        if cursor.take_while(is_letter).is_none() {
            break;
        }
        trailing_words += 1;
    }
    if trailing_words == 0 {
        return None;
    }
    loop {
        cursor.skip_whitespace();
        if !cursor.eat('.') {
            break;
        }
    }

    if contains_bracketed_code(cursor.rest(), config) {
        return None;
    }
    Some(code.to_string())
}

fn contains_bracketed_code(text: &str, config: &TokenizerConfig) -> bool {
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let mut cursor = Cursor::new(&rest[open + 1..], config);
        cursor.skip_whitespace();
        if cursor.take_while(is_alphanumeric).is_some() {
            cursor.skip_whitespace();
            if cursor.eat(']') {
                return true;
            }
        }
        rest = &rest[open + 1..];
    }
    false
}

/// Build alerts for monitored records, in record order.
///
/// Only the first body line of each record is inspected.
pub fn extract_alerts(records: &[LogRecord], rule: &AlertRule, config: &TokenizerConfig) -> Vec<Alert> {
    records
        .iter()
        .filter(|record| rule.matches(record))
        .filter_map(|record| {
            let first = record.first_body_line()?;
            let consultant_code = match_consultant_code(first, config)?;
            Some(Alert {
                consultant_code,
                patient_mrn: record.patient_mrn.clone(),
                category: rule.category.clone(),
            })
        })
        .collect()
}

/// Parse `input` and extract alerts, keeping parser warnings.
pub fn scan_log(input: &str, config: &ParserConfig) -> Result<ScanOutput, ParseError> {
    let document = parse_log(input, &config.tokenizer)?;
    let alerts = extract_alerts(&document.records, &config.rule, &config.tokenizer);
    Ok(ScanOutput {
        records: document.records.len(),
        alerts,
        warnings: document.warnings,
    })
}

/// Parse `input` and return the alert messages in file order.
pub fn process_log(input: &str, config: &ParserConfig) -> Result<Vec<String>, ParseError> {
    let output = scan_log(input, config)?;
    Ok(output.alerts.iter().map(Alert::to_string).collect())
}
