//! Daemon configuration
//!
//! Read from an optional file (`WARDEN_CONFIG`, format picked by extension)
//! with `WARDEN_*` environment variables layered on top. Thresholds have no
//! defaults: a daemon without both refuses to start.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use warden_lib::{AlertSettings, ConfigError, EngineConfig, RemediationPolicy, Thresholds};

pub const ENV_PREFIX: &str = "WARDEN";
pub const CONFIG_PATH_VAR: &str = "WARDEN_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub warning_threshold_hours: Option<f64>,

    #[serde(default)]
    pub critical_threshold_hours: Option<f64>,

    /// Dispatch owner notifications
    #[serde(default)]
    pub notify: bool,

    /// Stop/delete resources past the critical threshold
    #[serde(default)]
    pub remediate: bool,

    /// Resource groups never remediated (substring, case-insensitive)
    #[serde(default = "default_exempt_groups")]
    pub exempt_groups: Vec<String>,

    /// Snapshot file listed on every pass
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_account")]
    pub account: String,

    #[serde(default = "default_email_domain")]
    pub email_domain: String,

    #[serde(default = "default_sender")]
    pub sender: String,

    /// Department prefix -> addresses copied on warning and critical alerts
    #[serde(default)]
    pub heads: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub guidelines_url: Option<String>,
}

fn default_exempt_groups() -> Vec<String> {
    vec!["sales".to_string()]
}

fn default_interval() -> u64 {
    3600
}

fn default_api_port() -> u16 {
    8080
}

fn default_account() -> String {
    "default".to_string()
}

fn default_email_domain() -> String {
    "example.com".to_string()
}

fn default_sender() -> String {
    "Cloud Team <cloud@example.com>".to_string()
}

impl WardenConfig {
    /// Load from `WARDEN_CONFIG` (if set) and the `WARDEN_*` environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
        Self::load_from(file, ENV_PREFIX)
    }

    pub fn load_from(file: Option<PathBuf>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &file {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exempt_groups"),
        );

        let config = builder.build().context("Failed to read configuration")?;
        let loaded: WardenConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        loaded.thresholds()?;
        Ok(loaded)
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::from_optional_hours(self.warning_threshold_hours, self.critical_threshold_hours)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(EngineConfig::new(self.thresholds()?)
            .with_notify(self.notify)
            .with_remediate(self.remediate)
            .with_policy(RemediationPolicy::with_exempt_groups(
                self.exempt_groups.iter().cloned(),
            )))
    }

    pub fn alert_settings(&self) -> Result<AlertSettings, ConfigError> {
        let mut settings = AlertSettings::new(self.thresholds()?);
        settings.account = self.account.clone();
        settings.sender = self.sender.clone();
        settings.email_domain = self.email_domain.clone();
        settings.heads = self
            .heads
            .iter()
            .map(|(dept, cc)| (dept.to_lowercase(), cc.clone()))
            .collect();
        settings.remediation_enabled = self.remediate;
        settings.guidelines_url = self.guidelines_url.clone();
        Ok(settings)
    }
}
