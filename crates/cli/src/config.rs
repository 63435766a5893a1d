//! Configuration management for the CLI
//!
//! Defaults live in `~/.config/wardenctl/config.json`; command-line flags
//! and their environment fallbacks take precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use warden_lib::{ConfigError, Thresholds};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub snapshot_path: Option<PathBuf>,
    pub warning_threshold_hours: Option<f64>,
    pub critical_threshold_hours: Option<f64>,
    pub account: Option<String>,
    pub email_domain: Option<String>,
    pub sender: Option<String>,
    #[serde(default)]
    pub exempt_groups: Vec<String>,
    /// Department prefix -> addresses copied on warning and critical alerts
    #[serde(default)]
    pub heads: HashMap<String, Vec<String>>,
}

impl Config {
    /// Load the config at `path`, or the default location; a missing file is empty config
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Flags win over the config file; neither may be missing
    pub fn thresholds(
        &self,
        warning_hours: Option<f64>,
        critical_hours: Option<f64>,
    ) -> Result<Thresholds, ConfigError> {
        Thresholds::from_optional_hours(
            warning_hours.or(self.warning_threshold_hours),
            critical_hours.or(self.critical_threshold_hours),
        )
    }

    pub fn snapshot(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.snapshot_path.clone()).context(
            "No snapshot given: pass --snapshot, set WARDEN_SNAPSHOT_PATH or snapshot_path in the config file",
        )
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("wardenctl").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Some(Path::new("/nonexistent/wardenctl.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_and_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"warning_threshold_hours": 12, "critical_threshold_hours": 48, "account": "qa"}}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.account.as_deref(), Some("qa"));

        let from_file = config.thresholds(None, None).unwrap();
        assert_eq!(from_file.critical_hours(), 48.0);

        let overridden = config.thresholds(Some(6.0), Some(24.0)).unwrap();
        assert_eq!(overridden.warning_hours(), 6.0);
    }

    #[test]
    fn test_thresholds_required() {
        assert_eq!(
            Config::default().thresholds(Some(1.0), None),
            Err(ConfigError::MissingThreshold { name: "critical" })
        );
    }

    #[test]
    fn test_snapshot_flag_wins() {
        let config = Config {
            snapshot_path: Some(PathBuf::from("/from/config.json")),
            ..Config::default()
        };
        assert_eq!(
            config.snapshot(Some(PathBuf::from("/from/flag.json"))).unwrap(),
            PathBuf::from("/from/flag.json")
        );
        assert!(Config::default().snapshot(None).is_err());
    }
}
