//! Model: AgentConfig and related structs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::notify::Destination;
use crate::parser::{AlertRule, ParserConfig, TokenizerConfig, UnknownSymbolPolicy};
use crate::parser::extract::EXCLUDED_SEGMENT_CODE;

pub const DEFAULT_STATE_FILE: &str = "galaxy_error_log_content_previous_errors.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Folder the Galaxy system writes its error logs to
    pub watch_dir: String,
    /// Previously notified alerts; relative paths resolve next to the executable
    pub state_file: String,
    /// Where scratch copies go (system temp dir when unset)
    pub scratch_dir: Option<String>,
    pub poll_interval_secs: u64,
    pub parser: ParserSettings,
    pub slack: SlackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub segment_code: String,
    pub category: String,
    /// Appended to the default body symbol set
    pub extra_body_symbols: String,
    pub unknown_symbols: UnknownSymbolPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub api_base: String,
    /// Name of the environment variable holding the bot token
    pub token_env: String,
    pub channel: String,
    /// Display name (`real_name`) of the person receiving test messages
    pub dm_user: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            watch_dir: String::new(),
            state_file: DEFAULT_STATE_FILE.to_string(),
            scratch_dir: None,
            poll_interval_secs: 300,
            parser: ParserSettings::default(),
            slack: SlackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        let rule = AlertRule::default();
        Self {
            segment_code: rule.segment_code,
            category: rule.category,
            extra_body_symbols: String::new(),
            unknown_symbols: UnknownSymbolPolicy::Warn,
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: "https://slack.com/api".to_string(),
            token_env: "SLACK_BOT_TOKEN".to_string(),
            channel: "backoffice".to_string(),
            dm_user: None,
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AgentConfig {
    pub fn watch_path(&self) -> PathBuf {
        PathBuf::from(&self.watch_dir)
    }

    /// Resolve `state_file`, anchoring relative paths at the executable's directory.
    pub fn state_path(&self) -> PathBuf {
        let path = Path::new(&self.state_file);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    pub fn scratch_path(&self) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir(),
        }
    }

    /// Validate configuration values (no I/O).
    pub fn validate(&self) -> Result<(), String> {
        if self.watch_dir.is_empty() {
            return Err("watch_dir must be set".to_string());
        }
        if self.state_file.is_empty() {
            return Err("state_file must not be empty".to_string());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be > 0".to_string());
        }
        self.parser.validate()?;
        self.slack.validate()?;
        Ok(())
    }
}

impl ParserSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.segment_code.is_empty() {
            return Err("parser.segment_code must not be empty".to_string());
        }
        if self.segment_code == EXCLUDED_SEGMENT_CODE {
            return Err(format!(
                "parser.segment_code {} is general admission and cannot be monitored",
                EXCLUDED_SEGMENT_CODE
            ));
        }
        if self.category.is_empty() {
            return Err("parser.category must not be empty".to_string());
        }
        if let Some(c) = self
            .extra_body_symbols
            .chars()
            .find(|c| c.is_whitespace() || c.is_ascii_alphanumeric())
        {
            return Err(format!(
                "parser.extra_body_symbols may only contain symbols, found {:?}",
                c
            ));
        }
        Ok(())
    }

    pub fn to_parser_config(&self) -> ParserConfig {
        ParserConfig {
            tokenizer: TokenizerConfig::new()
                .with_extra_symbols(&self.extra_body_symbols)
                .with_unknown_symbols(self.unknown_symbols),
            rule: AlertRule {
                segment_code: self.segment_code.clone(),
                category: self.category.clone(),
            },
        }
    }
}

impl SlackConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base.is_empty() {
            return Err("slack.api_base must not be empty".to_string());
        }
        if self.token_env.is_empty() {
            return Err("slack.token_env must not be empty".to_string());
        }
        if self.channel.is_empty() {
            return Err("slack.channel must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("slack.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Where alerts are posted.
    pub fn alert_destination(&self) -> Destination {
        Destination::Channel(self.channel.clone())
    }

    /// Direct-message destination for test messages, if configured.
    pub fn test_destination(&self) -> Option<Destination> {
        self.dm_user.clone().map(Destination::DirectMessage)
    }
}
