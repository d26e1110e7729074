//! Load: config loading from file and environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::AgentConfig;

pub const CONFIG_FILE_ENV: &str = "GALAXY_CONFIG_FILE";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/galaxy-agent/agent.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AgentConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::from_file(path)?
            }
            None => {
                let config_path = std::env::var(CONFIG_FILE_ENV)
                    .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
                if Path::new(&config_path).exists() {
                    tracing::info!("Loading configuration from: {}", config_path);
                    Self::from_file(Path::new(&config_path))?
                } else {
                    tracing::info!("Config file not found at {}, using environment variables", config_path);
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment variables override file config
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("GALAXY_WATCH_DIR") {
            self.watch_dir = dir;
        }
        if let Some(file) = lookup("GALAXY_STATE_FILE") {
            self.state_file = file;
        }
        if let Some(dir) = lookup("GALAXY_SCRATCH_DIR") {
            self.scratch_dir = Some(dir);
        }
        if let Some(secs) = lookup("GALAXY_POLL_INTERVAL").and_then(|s| s.parse().ok()) {
            self.poll_interval_secs = secs;
        }
        if let Some(channel) = lookup("GALAXY_SLACK_CHANNEL") {
            self.slack.channel = channel;
        }
        if let Some(user) = lookup("GALAXY_SLACK_DM_USER") {
            self.slack.dm_user = Some(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::model::LogFormat;
    use crate::parser::UnknownSymbolPolicy;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_from_toml_full() {
        let config = AgentConfig::from_toml(
            r##"
            watch_dir = '\\fileserver\SFTP\GalaxyConfig\LIVE'
            state_file = "/var/lib/galaxy-agent/seen.txt"
            poll_interval_secs = 60

            [parser]
            extra_body_symbols = "#?"
            unknown_symbols = "reject"

            [slack]
            channel = "theatres"
            dm_user = "Jane Doe"

            [logging]
            level = "debug"
            format = "json"
            "##,
        )
        .unwrap();

        assert_eq!(config.watch_dir, r"\\fileserver\SFTP\GalaxyConfig\LIVE");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.parser.segment_code, "A05");
        assert_eq!(config.parser.unknown_symbols, UnknownSymbolPolicy::Reject);
        assert_eq!(config.slack.channel, "theatres");
        assert_eq!(config.slack.token_env, "SLACK_BOT_TOKEN");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_toml_empty_uses_defaults() {
        let config = AgentConfig::from_toml("").unwrap();
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.slack.channel, "backoffice");
        assert_eq!(config.parser.category, "Access Plan Entry");
    }

    #[test]
    fn test_from_toml_rejects_bad_policy() {
        let result = AgentConfig::from_toml("[parser]\nunknown_symbols = \"ignore\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "watch_dir = \"/srv/galaxy\"").unwrap();
        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.watch_dir, "/srv/galaxy");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AgentConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GALAXY_WATCH_DIR", "/mnt/live"),
            ("GALAXY_POLL_INTERVAL", "45"),
            ("GALAXY_SLACK_DM_USER", "On Call"),
        ]);
        let mut config = AgentConfig::from_toml("watch_dir = \"/srv/galaxy\"").unwrap();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.watch_dir, "/mnt/live");
        assert_eq!(config.poll_interval_secs, 45);
        assert_eq!(config.slack.dm_user.as_deref(), Some("On Call"));
        assert_eq!(config.slack.channel, "backoffice");
    }

    #[test]
    fn test_unparseable_interval_ignored() {
        let mut config = AgentConfig::default();
        config.apply_overrides(|key| (key == "GALAXY_POLL_INTERVAL").then(|| "soon".to_string()));
        assert_eq!(config.poll_interval_secs, 300);
    }
}
