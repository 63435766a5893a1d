//! GCE instances and the zone operation log

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{actor_name, ActorResolver};
use crate::models::{Provider, Resource, ResourceKind, ResourceState};

pub const EXCLUDE_LABEL: &str = "exclude";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GceInstance {
    pub id: String,
    pub name: String,
    /// Zone name, e.g. `us-central1-a`
    pub zone: String,
    pub status: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// One entry of the zone operation log, most recent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GceOperation {
    pub target_id: String,
    pub status: String,
    pub operation_type: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl GceOperation {
    /// Completed insert/start targeting the given instance
    fn launched(&self, instance_id: &str) -> bool {
        self.target_id == instance_id
            && self.status == "DONE"
            && matches!(self.operation_type.as_str(), "insert" | "start")
    }
}

/// Zone operation log, as returned by the operations list call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog(pub Vec<GceOperation>);

impl OperationLog {
    pub fn last_launch(&self, instance_id: &str) -> Option<&GceOperation> {
        self.0.iter().find(|op| op.launched(instance_id))
    }
}

impl ActorResolver for OperationLog {
    fn last_actor(&self, resource_id: &str) -> Option<String> {
        self.last_launch(resource_id)
            .and_then(|op| actor_name(&op.user))
    }
}

pub fn parse_state(raw: &str) -> ResourceState {
    match raw {
        "RUNNING" => ResourceState::Running,
        "STAGING" | "PROVISIONING" | "REPAIRING" => ResourceState::Pending,
        "STOPPING" | "SUSPENDING" => ResourceState::Stopping,
        "TERMINATED" | "SUSPENDED" => ResourceState::Stopped,
        _ => ResourceState::Unknown,
    }
}

/// Region of a zone: `europe-west1-b` -> `europe-west1`
pub fn region_of(zone: &str) -> &str {
    zone.rsplit_once('-').map_or(zone, |(region, _)| region)
}

pub fn normalize(instance: &GceInstance, operations: &OperationLog) -> Resource {
    let launch = operations.last_launch(&instance.id);
    let excluded = instance
        .labels
        .keys()
        .any(|k| k.eq_ignore_ascii_case(EXCLUDE_LABEL));

    Resource::builder(Provider::Gcp, &instance.id, region_of(&instance.zone))
        .kind(ResourceKind::Instance)
        .name(&instance.name)
        .state(parse_state(&instance.status))
        .launch_time(launch.and_then(|op| op.end_time))
        .owner(operations.last_actor(&instance.id))
        .excluded(excluded)
        .tags(instance.labels.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn op(target: &str, status: &str, kind: &str, user: &str, hour: u32) -> GceOperation {
        GceOperation {
            target_id: target.to_string(),
            status: status.to_string(),
            operation_type: kind.to_string(),
            user: user.to_string(),
            end_time: Some(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()),
        }
    }

    fn instance(status: &str) -> GceInstance {
        GceInstance {
            id: "4242".to_string(),
            name: "trainer".to_string(),
            zone: "us-central1-a".to_string(),
            status: status.to_string(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_region_of_zone() {
        assert_eq!(region_of("us-central1-a"), "us-central1");
        assert_eq!(region_of("europe-west1-b"), "europe-west1");
        assert_eq!(region_of("local"), "local");
    }

    #[test]
    fn test_owner_and_launch_from_latest_start() {
        let log = OperationLog(vec![
            op("4242", "RUNNING", "start", "eve@corp.com", 11),
            op("9999", "DONE", "start", "mallory@corp.com", 10),
            op("4242", "DONE", "setMetadata", "ops@corp.com", 9),
            op("4242", "DONE", "start", "bob.jones@corp.com", 8),
            op("4242", "DONE", "insert", "alice@corp.com", 1),
        ]);

        let resource = normalize(&instance("RUNNING"), &log);
        assert_eq!(resource.owner.as_deref(), Some("bob.jones"));
        assert_eq!(
            resource.launch_time,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(resource.region, "us-central1");
    }

    #[test]
    fn test_no_operations_means_unknown_owner() {
        let resource = normalize(&instance("RUNNING"), &OperationLog::default());
        assert!(resource.owner.is_none());
        assert!(resource.launch_time.is_none());
    }

    #[test]
    fn test_exclude_label_case_insensitive() {
        let mut gce = instance("RUNNING");
        gce.labels.insert("EXCLUDE".to_string(), "yes".to_string());
        assert!(normalize(&gce, &OperationLog::default()).excluded);
    }

    #[test]
    fn test_state_vocabulary() {
        assert_eq!(parse_state("STAGING"), ResourceState::Pending);
        assert_eq!(parse_state("SUSPENDING"), ResourceState::Stopping);
        assert_eq!(parse_state("TERMINATED"), ResourceState::Stopped);
        assert_eq!(parse_state("running"), ResourceState::Unknown);
    }
}
