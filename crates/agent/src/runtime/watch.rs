//! Watch: periodic passes over the watch directory.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::pass::{locate_latest, process_file, PassReport};
use crate::conf::AgentConfig;
use crate::error::AgentError;
use crate::files::LatestFile;
use crate::notify::Notifier;

/// Run one poll. Returns `Ok(None)` when the newest file has not changed
/// since the last processed one.
///
/// `last_seen` is updated only when every new alert was delivered or the
/// file failed to parse. Failed deliveries and I/O errors leave it alone so
/// the next poll retries the same file.
pub async fn poll_once(
    config: &AgentConfig,
    notifier: &dyn Notifier,
    last_seen: &mut Option<LatestFile>,
) -> Result<Option<PassReport>, AgentError> {
    let latest = locate_latest(&config.watch_path())?;
    if last_seen.as_ref() == Some(&latest) {
        debug!("{} unchanged, skipping", latest.path.display());
        return Ok(None);
    }

    info!("Checking {}", latest.path.display());
    let result = process_file(config, &latest.path, notifier).await;
    let settled = match &result {
        Ok(report) => report.is_clean(),
        Err(AgentError::Parse { .. }) => true,
        Err(_) => false,
    };
    if settled {
        *last_seen = Some(latest);
    }
    result.map(Some)
}

/// Poll forever at `poll_interval_secs`. Failures are logged and the loop
/// carries on.
pub async fn watch(config: &AgentConfig, notifier: &dyn Notifier) {
    info!(
        "Watching {} (interval: {}s)",
        config.watch_dir, config.poll_interval_secs
    );

    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_seen: Option<LatestFile> = None;
    let mut consecutive_failures: u32 = 0;

    loop {
        interval.tick().await;

        match poll_once(config, notifier, &mut last_seen).await {
            Ok(Some(report)) => {
                consecutive_failures = 0;
                report.log();
            }
            Ok(None) => {
                consecutive_failures = 0;
            }
            Err(e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                error!("Pass failed (attempt {}): {}", consecutive_failures, e);
                if consecutive_failures >= 3 {
                    warn!(
                        "{} consecutive passes have failed - check {}",
                        consecutive_failures, config.watch_dir
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::FakeNotifier;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;

    const RECORD: &str = "14-Sep-15 09:35:01A05 for Patient: 654321-\n\
                          The Consultant [C6103187] Does Not Exist Within The Surgery Application.\n\n";

    fn config(watch: &std::path::Path, work: &std::path::Path) -> AgentConfig {
        AgentConfig {
            watch_dir: watch.display().to_string(),
            state_file: work.join("seen.txt").display().to_string(),
            scratch_dir: Some(work.display().to_string()),
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unchanged_file_skipped() {
        let watch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let config = config(watch.path(), work.path());
        let log = watch.path().join("errors.log");
        fs::write(&log, RECORD).unwrap();
        set_file_mtime(&log, FileTime::from_unix_time(1_000, 0)).unwrap();
        let notifier = FakeNotifier::new();
        let mut last_seen = None;

        let first = poll_once(&config, &notifier, &mut last_seen).await.unwrap();
        assert_eq!(first.unwrap().delivered.len(), 1);

        let second = poll_once(&config, &notifier, &mut last_seen).await.unwrap();
        assert!(second.is_none());

        set_file_mtime(&log, FileTime::from_unix_time(2_000, 0)).unwrap();
        let third = poll_once(&config, &notifier, &mut last_seen).await.unwrap();
        assert_eq!(third.unwrap().duplicates, 1);
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_file_not_retried() {
        let watch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let config = config(watch.path(), work.path());
        fs::write(watch.path().join("errors.log"), "garbage").unwrap();
        let notifier = FakeNotifier::new();
        let mut last_seen = None;

        let first = poll_once(&config, &notifier, &mut last_seen).await;
        assert!(matches!(first, Err(AgentError::Parse { .. })));
        assert!(last_seen.is_some());

        let second = poll_once(&config, &notifier, &mut last_seen).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_retried_on_next_poll() {
        let watch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let config = config(watch.path(), work.path());
        fs::write(watch.path().join("errors.log"), RECORD).unwrap();
        let mut last_seen = None;

        let outage = FakeNotifier::failing();
        let first = poll_once(&config, &outage, &mut last_seen).await.unwrap().unwrap();
        assert_eq!(first.failed.len(), 1);
        assert!(last_seen.is_none());

        let recovered = FakeNotifier::new();
        let second = poll_once(&config, &recovered, &mut last_seen).await.unwrap();
        assert_eq!(second.unwrap().delivered.len(), 1);
        assert_eq!(recovered.sent().await.len(), 1);
        assert!(last_seen.is_some());

        let third = poll_once(&config, &recovered, &mut last_seen).await.unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn test_empty_directory_leaves_state() {
        let watch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let config = config(watch.path(), work.path());
        let notifier = FakeNotifier::new();
        let mut last_seen = None;

        let result = poll_once(&config, &notifier, &mut last_seen).await;
        assert!(matches!(result, Err(AgentError::EmptyDirectory(_))));
        assert!(last_seen.is_none());
    }
}
