//! Dedup: flat-file record of alerts that have already been sent.
//!
//! The file is plain text, one alert per line. Lookups are substring
//! checks against the whole record, so files written by older tooling
//! (alerts concatenated without separators) are still honoured.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    content: String,
}

impl DedupStore {
    /// Load the record at `path`. A missing file is an empty record.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No dedup record at {}, starting empty", path.display());
                String::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self { path, content })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, alert: &str) -> bool {
        self.content.contains(alert)
    }

    /// Persist `alert`, creating the file on first use.
    pub fn append(&mut self, alert: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut line = String::with_capacity(alert.len() + 1);
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(alert);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        self.content.push_str(&line);
        Ok(())
    }
}
