//! Pass: one locate → copy → parse → dedup → notify → record cycle.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::conf::AgentConfig;
use crate::error::AgentError;
use crate::files::{most_recent_file, LatestFile, ScratchCopy};
use crate::notify::{Notifier, NotifyError};
use crate::parser::scan_log;
use crate::store::DedupStore;

/// What a pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    pub file: PathBuf,
    pub records: usize,
    pub warnings: usize,
    /// Alerts already present in the dedup record
    pub duplicates: usize,
    /// Alerts delivered and recorded during this pass
    pub delivered: Vec<String>,
    /// Alerts whose delivery failed; they stay unrecorded
    pub failed: Vec<(String, NotifyError)>,
}

impl PassReport {
    /// True when every new alert was delivered.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log(&self) {
        info!(
            "Processed {}: {} records, {} new alerts, {} already reported, {} failed deliveries",
            self.file.display(),
            self.records,
            self.delivered.len(),
            self.duplicates,
            self.failed.len()
        );
    }
}

/// The newest file in `dir`, or [`AgentError::EmptyDirectory`].
pub fn locate_latest(dir: &Path) -> Result<LatestFile, AgentError> {
    most_recent_file(dir)
        .map_err(|e| AgentError::io(format!("listing {}", dir.display()), e))?
        .ok_or_else(|| AgentError::EmptyDirectory(dir.to_path_buf()))
}

/// Process one log file end to end.
///
/// A grammar failure aborts before anything is sent. Failed deliveries
/// are collected in the report and left out of the dedup record so the
/// next pass tries them again.
pub async fn process_file(
    config: &AgentConfig,
    file: &Path,
    notifier: &dyn Notifier,
) -> Result<PassReport, AgentError> {
    let scratch_dir = config.scratch_path();
    let copy = ScratchCopy::create(file, &scratch_dir).map_err(|e| {
        AgentError::io(format!("copying {} to {}", file.display(), scratch_dir.display()), e)
    })?;
    let text = copy
        .read_text()
        .map_err(|e| AgentError::io(format!("reading {}", copy.path().display()), e))?;
    if let Err(e) = copy.remove() {
        warn!("Failed to remove scratch copy: {}", e);
    }

    let output = scan_log(&text, &config.parser.to_parser_config()).map_err(|source| AgentError::Parse {
        path: file.to_path_buf(),
        source,
    })?;
    for warning in &output.warnings {
        warn!("{}: {}", file.display(), warning);
    }
    debug!("Parsed {} records, {} alerts", output.records, output.alerts.len());

    let state_path = config.state_path();
    let mut store = DedupStore::open(&state_path)
        .map_err(|e| AgentError::io(format!("reading {}", state_path.display()), e))?;
    let destination = config.slack.alert_destination();

    let mut report = PassReport {
        file: file.to_path_buf(),
        records: output.records,
        warnings: output.warnings.len(),
        ..PassReport::default()
    };

    for alert in &output.alerts {
        let message = alert.to_string();
        if store.contains(&message) {
            debug!("Already reported: {}", message);
            report.duplicates += 1;
            continue;
        }

        match notifier.notify(&destination, &message).await {
            Ok(()) => {
                store
                    .append(&message)
                    .map_err(|e| AgentError::io(format!("recording alert in {}", state_path.display()), e))?;
                info!("Reported: {}", message);
                report.delivered.push(message);
            }
            Err(e) => {
                warn!("Failed to deliver '{}' to {}: {}", message, destination, e);
                report.failed.push((message, e));
            }
        }
    }

    Ok(report)
}

/// Locate the newest file in the watch directory and process it.
pub async fn run_pass(config: &AgentConfig, notifier: &dyn Notifier) -> Result<PassReport, AgentError> {
    let latest = locate_latest(&config.watch_path())?;
    info!("Checking {}", latest.path.display());
    process_file(config, &latest.path, notifier).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Destination, FakeNotifier};
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = include_str!("../../testdata/galaxy_error_sample.log");
    const FIRST: &str = "Galaxy C-Code Missing: C6103187 for Patient MRN: 654321 (Access Plan Entry)";
    const SECOND: &str = "Galaxy C-Code Missing: C1234567 for Patient MRN: 123456 (Access Plan Entry)";

    struct Fixture {
        watch: TempDir,
        work: TempDir,
        config: AgentConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let watch = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let config = AgentConfig {
                watch_dir: watch.path().display().to_string(),
                state_file: work.path().join("seen.txt").display().to_string(),
                scratch_dir: Some(work.path().display().to_string()),
                ..AgentConfig::default()
            };
            Self { watch, work, config }
        }

        fn write_log(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.watch.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        }

        fn state(&self) -> String {
            fs::read_to_string(self.work.path().join("seen.txt")).unwrap_or_default()
        }

        /// Files left in the work dir besides the dedup record.
        fn scratch_leftovers(&self) -> usize {
            fs::read_dir(self.work.path())
                .unwrap()
                .filter(|e| e.as_ref().unwrap().file_name() != "seen.txt")
                .count()
        }
    }

    #[tokio::test]
    async fn test_pass_delivers_and_records() {
        let fx = Fixture::new();
        fx.write_log("errors.log", SAMPLE);
        let notifier = FakeNotifier::new();

        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert_eq!(report.records, 6);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.delivered.len(), 3);
        assert!(report.is_clean());
        assert_eq!(notifier.sent_texts().await[..2], [FIRST.to_string(), SECOND.to_string()]);
        assert_eq!(notifier.sent().await[0].0, Destination::Channel("backoffice".to_string()));
        assert!(fx.state().contains(FIRST));
        assert_eq!(fx.scratch_leftovers(), 0);
    }

    #[tokio::test]
    async fn test_second_pass_sends_nothing() {
        let fx = Fixture::new();
        fx.write_log("errors.log", SAMPLE);
        let notifier = FakeNotifier::new();

        run_pass(&fx.config, &notifier).await.unwrap();
        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert!(report.delivered.is_empty());
        assert_eq!(report.duplicates, 3);
        assert_eq!(notifier.sent().await.len(), 3);
    }

    #[tokio::test]
    async fn test_previously_recorded_alert_skipped() {
        let fx = Fixture::new();
        fs::write(fx.work.path().join("seen.txt"), FIRST).unwrap();
        fx.write_log("errors.log", SAMPLE);
        let notifier = FakeNotifier::new();

        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert_eq!(report.duplicates, 1);
        assert!(!notifier.sent_texts().await.contains(&FIRST.to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_within_one_file_sent_once() {
        let fx = Fixture::new();
        let record = "14-Sep-15 09:35:01A05 for Patient: 654321-\n\
                      The Consultant [C6103187] Does Not Exist Within The Surgery Application.\n\n";
        fx.write_log("errors.log", &record.repeat(2));
        let notifier = FakeNotifier::new();

        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert_eq!(report.delivered, vec![FIRST.to_string()]);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_not_recorded() {
        let fx = Fixture::new();
        fx.write_log("errors.log", SAMPLE);
        let notifier = FakeNotifier::new();
        notifier.reject(SECOND).await;

        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, SECOND);
        assert_eq!(report.delivered.len(), 2);
        assert!(!fx.state().contains(SECOND));
        assert!(fx.state().contains(FIRST));
    }

    #[tokio::test]
    async fn test_newest_file_is_processed() {
        use filetime::{set_file_mtime, FileTime};

        let fx = Fixture::new();
        let old = fx.write_log("old.log", SAMPLE);
        set_file_mtime(&old, FileTime::from_unix_time(1_000, 0)).unwrap();
        let new = fx.write_log("new.log", "14-Sep-15 09:35:01A03 for Patient: 1-\nUpdated.\n\n");
        set_file_mtime(&new, FileTime::from_unix_time(2_000, 0)).unwrap();
        let notifier = FakeNotifier::new();

        let report = run_pass(&fx.config, &notifier).await.unwrap();

        assert_eq!(report.file, new);
        assert_eq!(report.records, 1);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let fx = Fixture::new();
        let notifier = FakeNotifier::new();

        let result = run_pass(&fx.config, &notifier).await;
        assert!(matches!(result, Err(AgentError::EmptyDirectory(_))));
    }

    #[tokio::test]
    async fn test_grammar_failure_sends_nothing() {
        let fx = Fixture::new();
        fx.write_log("errors.log", "14-Sep-15 09:35:01A05 for Patient: 654321-\nno terminator");
        let notifier = FakeNotifier::new();

        let result = run_pass(&fx.config, &notifier).await;

        assert!(matches!(result, Err(AgentError::Parse { .. })));
        assert!(notifier.sent().await.is_empty());
        assert_eq!(fx.state(), "");
        assert_eq!(fx.scratch_leftovers(), 0);
    }

    #[test]
    fn test_locate_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = locate_latest(&dir.path().join("gone"));
        assert!(matches!(result, Err(AgentError::Io { .. })));
    }
}
