//! Azure virtual machines and HDInsight clusters

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{actor_name, ActorResolver};
use crate::models::{Provider, Resource, ResourceKind, ResourceState};

const VM_START_OPERATION: &str = "virtualMachines/start/action";
const VM_WRITE_OPERATION: &str = "virtualMachines/write";
const CLUSTER_WRITE_OPERATION: &str = "Microsoft.HDInsight/clusters/write";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureVm {
    pub id: String,
    pub name: String,
    pub location: String,
    pub resource_group: String,
    /// Power state display status from the instance view (`VM running`, ...)
    #[serde(default)]
    pub display_status: Option<String>,
    /// Status time of the first OS disk
    #[serde(default)]
    pub disk_status_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdInsightCluster {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    pub cluster_state: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub resource_id: String,
    pub caller: String,
    pub operation_name: String,
}

impl ActivityEntry {
    fn is_launch(&self) -> bool {
        self.operation_name.contains(VM_START_OPERATION)
            || self.operation_name.contains(VM_WRITE_OPERATION)
            || self.operation_name.contains(CLUSTER_WRITE_OPERATION)
    }
}

/// Subscription activity log, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog(pub Vec<ActivityEntry>);

impl ActorResolver for ActivityLog {
    fn last_actor(&self, resource_id: &str) -> Option<String> {
        self.0
            .iter()
            .filter(|e| e.resource_id.eq_ignore_ascii_case(resource_id))
            .find(|e| e.is_launch())
            .and_then(|e| actor_name(&e.caller))
    }
}

pub fn parse_vm_state(display_status: Option<&str>) -> ResourceState {
    match display_status {
        Some("VM running") => ResourceState::Running,
        Some("VM starting") => ResourceState::Pending,
        Some("VM stopping") | Some("VM deallocating") => ResourceState::Stopping,
        Some("VM stopped") | Some("VM deallocated") => ResourceState::Stopped,
        _ => ResourceState::Unknown,
    }
}

pub fn parse_cluster_state(raw: &str) -> ResourceState {
    match raw {
        "Running" => ResourceState::Running,
        "Deleting" => ResourceState::Stopping,
        "Accepted"
        | "InProgress"
        | "HdInsightConfiguration"
        | "ClusterStorageProvisioned"
        | "AzureVMConfiguration"
        | "Operational" => ResourceState::Pending,
        _ => ResourceState::Unknown,
    }
}

/// Resource group segment of an ARM id
pub fn resource_group_of(id: &str) -> Option<String> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().filter(|g| !g.is_empty()).map(String::from);
        }
    }
    None
}

fn has_exclude_tag(tags: &BTreeMap<String, String>) -> bool {
    tags.keys().any(|k| k.eq_ignore_ascii_case("exclude"))
}

pub fn normalize_vm(vm: &AzureVm, activity: &ActivityLog) -> Resource {
    Resource::builder(Provider::Azure, &vm.id, &vm.location)
        .kind(ResourceKind::Instance)
        .name(&vm.name)
        .secondary_group(Some(vm.resource_group.clone()))
        .state(parse_vm_state(vm.display_status.as_deref()))
        .launch_time(vm.disk_status_time)
        .owner(activity.last_actor(&vm.id))
        .excluded(has_exclude_tag(&vm.tags))
        .tags(vm.tags.clone())
        .build()
}

pub fn normalize_cluster(cluster: &HdInsightCluster, activity: &ActivityLog) -> Resource {
    Resource::builder(Provider::Azure, &cluster.id, &cluster.location)
        .kind(ResourceKind::Cluster)
        .name(&cluster.name)
        .secondary_group(resource_group_of(&cluster.id))
        .state(parse_cluster_state(&cluster.cluster_state))
        .launch_time(cluster.created_date)
        .owner(activity.last_actor(&cluster.id))
        .excluded(has_exclude_tag(&cluster.tags))
        .tags(cluster.tags.clone())
        .build()
}
