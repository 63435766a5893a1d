//! Recorded provider enumerations
//!
//! A snapshot is the JSON form of what the provider SDK collaborators
//! return for one account: native instance and cluster records together with
//! the operation/activity logs used to resolve owners.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::aws::{self, Ec2Instance};
use super::azure::{self, ActivityLog, AzureVm, HdInsightCluster};
use super::gcp::{self, GceInstance, OperationLog};
use crate::collector::ResourceSource;
use crate::models::Resource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSnapshot {
    #[serde(default)]
    pub instances: Vec<Ec2Instance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpSnapshot {
    #[serde(default)]
    pub instances: Vec<GceInstance>,
    #[serde(default)]
    pub operations: OperationLog,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureSnapshot {
    #[serde(default)]
    pub vms: Vec<AzureVm>,
    #[serde(default)]
    pub clusters: Vec<HdInsightCluster>,
    #[serde(default)]
    pub activity: ActivityLog,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub aws: AwsSnapshot,
    #[serde(default)]
    pub gcp: GcpSnapshot,
    #[serde(default)]
    pub azure: AzureSnapshot,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse snapshot")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    /// Normalize every record, AWS first, then GCP, then Azure VMs and clusters
    pub fn resources(&self) -> Vec<Resource> {
        let aws = self.aws.instances.iter().map(aws::normalize);
        let gcp = self
            .gcp
            .instances
            .iter()
            .map(|i| gcp::normalize(i, &self.gcp.operations));
        let vms = self
            .azure
            .vms
            .iter()
            .map(|vm| azure::normalize_vm(vm, &self.azure.activity));
        let clusters = self
            .azure
            .clusters
            .iter()
            .map(|c| azure::normalize_cluster(c, &self.azure.activity));

        aws.chain(gcp).chain(vms).chain(clusters).collect()
    }
}

/// Resource source backed by a snapshot file, re-read on every listing
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResourceSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn list(&self) -> Result<Vec<Resource>> {
        Ok(Snapshot::load(&self.path).await?.resources())
    }
}
