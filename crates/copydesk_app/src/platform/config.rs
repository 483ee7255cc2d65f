//! Application configuration, read from a RON file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes, e.g. `(api: (base_url: "https://writer.example"))`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use copydesk_core::{LocatorConfig, PollBudget};
use copydesk_engine::{ApiSettings, PollSettings};
use copydesk_logging::LogDestination;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "copydesk.ron";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let defaults = ApiSettings::default();
        Self {
            base_url: defaults.base_url,
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_transient_failures: u32,
    pub max_polls: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let budget = PollBudget::default();
        Self {
            interval_ms: 2_000,
            max_transient_failures: budget.max_transient_failures,
            max_polls: budget.max_polls,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".copydesk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogTarget {
    Terminal,
    File(PathBuf),
    Both(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub destination: LogTarget,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            destination: LogTarget::Terminal,
        }
    }
}

/// Score floors for the fuzzy claim matching tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub min_overlap: f64,
    pub min_dice: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let defaults = LocatorConfig::default();
        Self {
            min_overlap: defaults.min_overlap,
            min_dice: defaults.min_dice,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or `./copydesk.ron` when no path is given. Only an
    /// explicit path is required to exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.log_level()?;
        Ok(config)
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api.base_url.clone(),
            connect_timeout: Duration::from_millis(self.api.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.api.request_timeout_ms),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.polling.interval_ms),
            budget: PollBudget {
                max_transient_failures: self.polling.max_transient_failures,
                max_polls: self.polling.max_polls,
            },
        }
    }

    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            min_overlap: self.matching.min_overlap,
            min_dice: self.matching.min_dice,
            ..LocatorConfig::default()
        }
    }

    pub fn log_level(&self) -> anyhow::Result<LevelFilter> {
        LevelFilter::from_str(&self.log.level)
            .map_err(|_| anyhow::anyhow!("unknown log level {:?}", self.log.level))
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log.destination {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File(path) => LogDestination::File(path.clone()),
            LogTarget::Both(path) => LogDestination::Both(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            r#"(
                api: (base_url: "https://writer.example"),
                polling: (interval_ms: 500, max_polls: Some(40)),
                log: (destination: Both("desk.log")),
            )"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://writer.example");
        assert_eq!(config.api.request_timeout_ms, 30_000);
        assert_eq!(
            config.poll_settings(),
            PollSettings {
                interval: Duration::from_millis(500),
                budget: PollBudget {
                    max_transient_failures: 3,
                    max_polls: Some(40),
                },
            }
        );
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(
            config.log_destination(),
            LogDestination::Both(PathBuf::from("desk.log"))
        );
        assert_eq!(config.log_level().unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(AppConfig::parse("()").unwrap(), AppConfig::default());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let err = AppConfig::parse(r#"(log: (level: "chatty"))"#).unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("nope.ron");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn matching_floors_reach_the_locator() {
        let config = AppConfig::parse("(matching: (min_overlap: 0.4, min_dice: 0.2))").unwrap();
        let locator = config.locator_config();
        assert_eq!(locator.min_overlap, 0.4);
        assert_eq!(locator.min_dice, 0.2);
        assert_eq!(locator.min_token_len, LocatorConfig::default().min_token_len);
    }
}
