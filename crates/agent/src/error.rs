//! Error: failures of a processing pass.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no files found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl AgentError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AgentError::Io { context: context.into(), source }
    }
}
