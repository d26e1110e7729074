//! Locate: find the most recently modified file in the watch directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Return the regular file in `dir` with the newest modification time.
///
/// Subdirectories are skipped; symlinks are followed. On a tie the file
/// listed first wins. `Ok(None)` means the directory holds no files.
pub fn most_recent_file(dir: &Path) -> io::Result<Option<LatestFile>> {
    let mut latest: Option<LatestFile> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;

        let newer = match &latest {
            Some(current) => modified > current.modified,
            None => true,
        };
        if newer {
            latest = Some(LatestFile { path, modified });
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};

    fn touch(dir: &Path, name: &str, unix_secs: i64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
        path
    }

    #[test]
    fn test_picks_newest_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.log", 1_000);
        let newest = touch(dir.path(), "new.log", 3_000);
        touch(dir.path(), "middle.log", 2_000);

        let latest = most_recent_file(dir.path()).unwrap().unwrap();
        assert_eq!(latest.path, newest);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(most_recent_file(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_subdirectories_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        assert_eq!(most_recent_file(dir.path()).unwrap(), None);

        let only = touch(dir.path(), "errors.log", 1_000);
        assert_eq!(most_recent_file(dir.path()).unwrap().unwrap().path, only);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(most_recent_file(&dir.path().join("gone")).is_err());
    }

    #[test]
    fn test_reports_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "errors.log", 5_000);
        let latest = most_recent_file(dir.path()).unwrap().unwrap();
        assert_eq!(FileTime::from_system_time(latest.modified), FileTime::from_unix_time(5_000, 0));
    }
}
