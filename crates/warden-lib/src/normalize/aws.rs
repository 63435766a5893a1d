//! AWS EC2 instances

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Provider, Resource, ResourceKind, ResourceState};

/// Tag holding the opt-out flag
pub const EXCLUDE_TAG: &str = "EXCLUDE";
/// Tag maintained by the provisioning tooling with the last user
pub const LAST_USER_TAG: &str = "Last_user";
pub const NAME_TAG: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ec2Tag {
    pub key: String,
    pub value: String,
}

/// An EC2 instance as described by `DescribeInstances`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ec2Instance {
    pub instance_id: String,
    pub region: String,
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Instance state name (`pending`, `running`, `shutting-down`, ...)
    pub state: String,
    #[serde(default)]
    pub launch_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<Ec2Tag>,
}

impl Ec2Instance {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

pub fn parse_state(raw: &str) -> ResourceState {
    match raw {
        "pending" => ResourceState::Pending,
        "running" => ResourceState::Running,
        "shutting-down" | "stopping" => ResourceState::Stopping,
        "stopped" => ResourceState::Stopped,
        "terminated" => ResourceState::Terminated,
        _ => ResourceState::Unknown,
    }
}

pub fn normalize(instance: &Ec2Instance) -> Resource {
    let excluded = instance.tag(EXCLUDE_TAG).is_some_and(|v| !v.is_empty());

    Resource::builder(Provider::Aws, &instance.instance_id, &instance.region)
        .kind(ResourceKind::Instance)
        .name(instance.tag(NAME_TAG).unwrap_or_default())
        .state(parse_state(&instance.state))
        .launch_time(instance.launch_time)
        .owner(instance.tag(LAST_USER_TAG).map(String::from))
        .excluded(excluded)
        .tags(
            instance
                .tags
                .iter()
                .map(|t| (t.key.clone(), t.value.clone()))
                .collect(),
        )
        .build()
}
