//! Galaxy error log parsing
//!
//! Turns the raw text of one error log into alert messages for records
//! whose consultant C-code is missing from the Galaxy configuration.
//!
//! # Architecture
//!
//! - `lexer.rs`: tokenizer configuration, line splitting, per-line cursor
//! - `grammar.rs`: record grammar (header, body, merge block, record, log)
//! - `extract.rs`: segment filtering and consultant code extraction
//! - `model.rs`: records, alerts, warnings and errors
//!
//! Parsing is pure and all-or-nothing: a grammar mismatch anywhere in the
//! file fails the whole call and no alerts are returned.

pub mod extract;
pub mod grammar;
pub mod lexer;
pub mod model;

// Re-export commonly used types
pub use extract::{process_log, scan_log, AlertRule, ParserConfig, ScanOutput};
pub use grammar::{parse_log, MERGE_MARKER};
pub use lexer::{TokenizerConfig, UnknownSymbolPolicy};
pub use model::{Alert, LogDocument, LogRecord, ParseError, SymbolWarning};
