//! Core data models for the warden

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Cloud provider a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Aws => write!(f, "AWS"),
            Provider::Gcp => write!(f, "GCP"),
            Provider::Azure => write!(f, "Azure"),
        }
    }
}

/// What sort of compute unit a resource is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A virtual machine; remediated by stopping it
    Instance,
    /// A managed cluster; remediated by deleting it
    Cluster,
}

impl ResourceKind {
    /// Noun used in notifications
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Cluster => "cluster",
        }
    }
}

/// Normalized lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Running,
    Pending,
    Stopping,
    Stopped,
    Terminated,
    Unknown,
}

impl ResourceState {
    /// Parse a provider-neutral state name. Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => ResourceState::Running,
            "pending" | "starting" => ResourceState::Pending,
            "stopping" | "shutting-down" => ResourceState::Stopping,
            "stopped" => ResourceState::Stopped,
            "terminated" => ResourceState::Terminated,
            _ => ResourceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceState::Running => "running",
            ResourceState::Pending => "pending",
            ResourceState::Stopping => "stopping",
            ResourceState::Stopped => "stopped",
            ResourceState::Terminated => "terminated",
            ResourceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized compute unit, independent of provider
///
/// Built fresh for each pass and never mutated afterwards. Use
/// [`Resource::builder`] so the launch time invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: String,
    pub provider: Provider,
    pub kind: ResourceKind,
    pub region: String,
    /// Resource group or department, where the provider has one
    pub secondary_group: Option<String>,
    pub name: String,
    pub state: ResourceState,
    /// Only ever set while `state` is `Running`
    pub launch_time: Option<DateTime<Utc>>,
    /// Last known actor that created or started the resource
    pub owner: Option<String>,
    pub excluded: bool,
    pub tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn builder(
        provider: Provider,
        id: impl Into<String>,
        region: impl Into<String>,
    ) -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource {
                id: id.into(),
                provider,
                kind: ResourceKind::Instance,
                region: region.into(),
                secondary_group: None,
                name: String::new(),
                state: ResourceState::Unknown,
                launch_time: None,
                owner: None,
                excluded: false,
                tags: BTreeMap::new(),
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ResourceState::Running
    }
}

/// Builder for [`Resource`]
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn kind(mut self, kind: ResourceKind) -> Self {
        self.resource.kind = kind;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.resource.name = name.into();
        self
    }

    pub fn state(mut self, state: ResourceState) -> Self {
        self.resource.state = state;
        self
    }

    pub fn launch_time(mut self, launch_time: Option<DateTime<Utc>>) -> Self {
        self.resource.launch_time = launch_time;
        self
    }

    pub fn secondary_group(mut self, group: Option<String>) -> Self {
        self.resource.secondary_group = group.filter(|g| !g.is_empty());
        self
    }

    /// Set the owner. Blank owners are treated as unknown.
    pub fn owner(mut self, owner: Option<String>) -> Self {
        self.resource.owner = owner
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        self
    }

    pub fn excluded(mut self, excluded: bool) -> Self {
        self.resource.excluded = excluded;
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.resource.tags.extend(tags);
        self
    }

    pub fn build(mut self) -> Resource {
        if !self.resource.is_running() {
            self.resource.launch_time = None;
        }
        self.resource
    }
}

/// Age thresholds for escalation
///
/// Both values are non-negative and `critical >= warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    warning: Duration,
    critical: Duration,
}

impl Thresholds {
    pub fn new(warning: Duration, critical: Duration) -> Result<Self, ConfigError> {
        if warning < Duration::zero() {
            return Err(ConfigError::NegativeThreshold {
                name: "warning",
                hours: warning.num_seconds() as f64 / 3600.0,
            });
        }
        if critical < Duration::zero() {
            return Err(ConfigError::NegativeThreshold {
                name: "critical",
                hours: critical.num_seconds() as f64 / 3600.0,
            });
        }
        if critical < warning {
            return Err(ConfigError::InvertedThresholds {
                warning_secs: warning.num_seconds(),
                critical_secs: critical.num_seconds(),
            });
        }
        Ok(Self { warning, critical })
    }

    /// Build thresholds from fractional hours, as they appear in configuration
    pub fn from_hours(warning_hours: f64, critical_hours: f64) -> Result<Self, ConfigError> {
        let warning = hours_to_duration("warning", warning_hours)?;
        let critical = hours_to_duration("critical", critical_hours)?;
        Self::new(warning, critical)
    }

    /// Like [`Thresholds::from_hours`] but refuses to default a missing value
    pub fn from_optional_hours(
        warning_hours: Option<f64>,
        critical_hours: Option<f64>,
    ) -> Result<Self, ConfigError> {
        let warning = warning_hours.ok_or(ConfigError::MissingThreshold { name: "warning" })?;
        let critical = critical_hours.ok_or(ConfigError::MissingThreshold { name: "critical" })?;
        Self::from_hours(warning, critical)
    }

    pub fn warning(&self) -> Duration {
        self.warning
    }

    pub fn critical(&self) -> Duration {
        self.critical
    }

    /// Warning threshold in hours, for messages
    pub fn warning_hours(&self) -> f64 {
        self.warning.num_seconds() as f64 / 3600.0
    }

    pub fn critical_hours(&self) -> f64 {
        self.critical.num_seconds() as f64 / 3600.0
    }
}

fn hours_to_duration(name: &'static str, hours: f64) -> Result<Duration, ConfigError> {
    if !hours.is_finite() {
        return Err(ConfigError::NonFiniteThreshold { name });
    }
    if hours < 0.0 {
        return Err(ConfigError::NegativeThreshold { name, hours });
    }
    Duration::try_seconds((hours * 3600.0).round() as i64)
        .ok_or(ConfigError::ThresholdOutOfRange { name, hours })
}
