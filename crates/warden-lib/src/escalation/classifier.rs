//! Threshold classification of a single resource
//!
//! A resource's tier depends only on its own exclusion flag, state and
//! measured uptime against the two ordered thresholds, never on other
//! resources in the pass.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::EscalationTier;
use crate::models::{Resource, Thresholds};
use crate::uptime::uptime;

/// Outcome of classifying one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tier: EscalationTier,
    /// Past the critical threshold and eligible for auto stop/delete
    pub remediation_candidate: bool,
    /// Measured uptime; `None` when not running, excluded, or unknown
    #[serde(serialize_with = "serialize_uptime")]
    pub uptime: Option<Duration>,
}

impl Classification {
    fn unranked() -> Self {
        Self {
            tier: EscalationTier::None,
            remediation_candidate: false,
            uptime: None,
        }
    }
}

fn serialize_uptime<S>(uptime: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match uptime {
        Some(d) => serializer.serialize_some(&d.num_seconds()),
        None => serializer.serialize_none(),
    }
}

/// A resource paired with its classification for the current pass
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedResource {
    pub resource: Resource,
    pub classification: Classification,
}

impl ClassifiedResource {
    pub fn new(resource: Resource, now: DateTime<Utc>, thresholds: &Thresholds) -> Self {
        let classification = classify(&resource, now, thresholds);
        Self {
            resource,
            classification,
        }
    }

    pub fn tier(&self) -> EscalationTier {
        self.classification.tier
    }
}

/// Decide a resource's tier and whether it is a remediation candidate
pub fn classify(resource: &Resource, now: DateTime<Utc>, thresholds: &Thresholds) -> Classification {
    if !resource.is_running() || resource.excluded {
        return Classification::unranked();
    }
    let Some(launch_time) = resource.launch_time else {
        return Classification::unranked();
    };

    let measured = uptime(now, launch_time);

    let (tier, remediation_candidate) = if measured >= thresholds.critical() {
        (EscalationTier::Critical, true)
    } else if measured >= thresholds.warning() {
        (EscalationTier::Warning, false)
    } else if resource.owner.is_some() {
        (EscalationTier::Info, false)
    } else {
        (EscalationTier::None, false)
    };

    Classification {
        tier,
        remediation_candidate,
        uptime: Some(measured),
    }
}
