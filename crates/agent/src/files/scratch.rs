//! Scratch: private copy of a log file so the original is never held open.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tempfile::TempPath;

/// A uniquely named copy of a source file, deleted on [`ScratchCopy::remove`]
/// or when dropped.
#[derive(Debug)]
pub struct ScratchCopy {
    path: TempPath,
}

impl ScratchCopy {
    /// Copy `source` into `dir` under a fresh name.
    pub fn create(source: &Path, dir: &Path) -> io::Result<Self> {
        let mut input = File::open(source)?;
        let mut scratch = tempfile::Builder::new()
            .prefix("galaxy-agent-")
            .suffix(".log")
            .tempfile_in(dir)?;
        io::copy(&mut input, scratch.as_file_mut())?;

        // Close the handle; only the path (and its cleanup) is kept.
        let path = scratch.into_temp_path();
        tracing::debug!("Copied {} to {}", source.display(), path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the copy as text. Invalid UTF-8 is replaced rather than rejected.
    pub fn read_text(&self) -> io::Result<String> {
        let bytes = fs::read(&self.path)?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(
                    "{} is not valid UTF-8 (first bad byte at {}), decoding lossily",
                    self.path.display(),
                    e.utf8_error().valid_up_to()
                );
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    /// Delete the copy now, surfacing any error.
    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source_file(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join("errors.log");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_copy_and_read() {
        let src_dir = tempfile::tempdir().unwrap();
        let scratch_dir = tempfile::tempdir().unwrap();
        let source = source_file(src_dir.path(), b"line one\n");

        let copy = ScratchCopy::create(&source, scratch_dir.path()).unwrap();
        assert!(copy.path().starts_with(scratch_dir.path()));
        assert_eq!(copy.read_text().unwrap(), "line one\n");
        assert!(source.exists());
    }

    #[test]
    fn test_copies_get_distinct_names() {
        let src_dir = tempfile::tempdir().unwrap();
        let scratch_dir = tempfile::tempdir().unwrap();
        let source = source_file(src_dir.path(), b"x");

        let first = ScratchCopy::create(&source, scratch_dir.path()).unwrap();
        let second = ScratchCopy::create(&source, scratch_dir.path()).unwrap();
        assert_ne!(first.path(), second.path());

        let name = first.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("galaxy-agent-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_remove_deletes_copy() {
        let src_dir = tempfile::tempdir().unwrap();
        let source = source_file(src_dir.path(), b"x");
        let copy = ScratchCopy::create(&source, src_dir.path()).unwrap();
        let path = copy.path().to_path_buf();

        copy.remove().unwrap();
        assert!(!path.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_drop_deletes_copy() {
        let src_dir = tempfile::tempdir().unwrap();
        let source = source_file(src_dir.path(), b"x");
        let path = {
            let copy = ScratchCopy::create(&source, src_dir.path()).unwrap();
            copy.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_lossy_decoding() {
        let src_dir = tempfile::tempdir().unwrap();
        let source = source_file(src_dir.path(), b"Ward \xa34\n");
        let copy = ScratchCopy::create(&source, src_dir.path()).unwrap();
        assert_eq!(copy.read_text().unwrap(), "Ward \u{FFFD}4\n");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScratchCopy::create(&dir.path().join("absent.log"), dir.path()).is_err());
    }
}
