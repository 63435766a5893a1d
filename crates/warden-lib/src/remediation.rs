//! Batched auto-remediation of resources past the critical threshold
//!
//! Each bucket (provider scope + action) is handed to the provider as a
//! single stop/delete request. Buckets are independent: a failure is
//! recorded for that bucket and the others are still attempted. Nothing is
//! retried or rolled back.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::aggregate::RemediationGroups;
use crate::models::{Provider, Resource, ResourceKind};
use crate::observability::StructuredLogger;

/// What happens to a remediated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationAction {
    Stop,
    Delete,
}

impl RemediationAction {
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Instance => RemediationAction::Stop,
            ResourceKind::Cluster => RemediationAction::Delete,
        }
    }

    /// Past participle used in notifications ("will be STOPPED")
    pub fn past_tense(&self) -> &'static str {
        match self {
            RemediationAction::Stop => "STOPPED",
            RemediationAction::Delete => "DELETED",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationAction::Stop => write!(f, "stop"),
            RemediationAction::Delete => write!(f, "delete"),
        }
    }
}

/// Identifies one remediation bucket
///
/// `scope` is the resource group for Azure resources that carry one and the
/// region everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RemediationKey {
    pub provider: Provider,
    pub scope: String,
    pub action: RemediationAction,
}

impl RemediationKey {
    pub fn new(provider: Provider, scope: impl Into<String>, action: RemediationAction) -> Self {
        Self {
            provider,
            scope: scope.into(),
            action,
        }
    }

    pub fn for_resource(resource: &Resource) -> Self {
        let scope = match (resource.provider, &resource.secondary_group) {
            (Provider::Azure, Some(group)) => group.clone(),
            _ => resource.region.clone(),
        };
        Self::new(
            resource.provider,
            scope,
            RemediationAction::for_kind(resource.kind),
        )
    }
}

impl fmt::Display for RemediationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.provider, self.scope, self.action)
    }
}

/// Serialize a map keyed by bucket as `[[key, value], ...]`; JSON object keys
/// must be strings
pub(crate) fn serialize_buckets<S, V>(
    buckets: &BTreeMap<RemediationKey, V>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(buckets.iter())
}

/// Provider capability: stop or delete a batch of resources in one scope
#[async_trait]
pub trait RemediationProvider: Send + Sync {
    async fn apply(&self, key: &RemediationKey, resource_ids: &[String]) -> Result<()>;
}

/// Drives remediation requests for every bucket of a pass
pub struct RemediationDriver {
    provider: Arc<dyn RemediationProvider>,
    logger: StructuredLogger,
}

impl RemediationDriver {
    pub fn new(provider: Arc<dyn RemediationProvider>, logger: StructuredLogger) -> Self {
        Self { provider, logger }
    }

    /// Request one batched action per bucket and report success per bucket
    ///
    /// Buckets run concurrently; each task owns only its own key and ids.
    pub async fn remediate(&self, groups: &RemediationGroups) -> BTreeMap<RemediationKey, bool> {
        let mut handles = Vec::with_capacity(groups.len());

        for (key, ids) in groups {
            if ids.is_empty() {
                continue;
            }
            let provider = Arc::clone(&self.provider);
            let task_key = key.clone();
            let task_ids = ids.clone();
            let handle =
                tokio::spawn(async move { provider.apply(&task_key, &task_ids).await });
            handles.push((key.clone(), ids.clone(), handle));
        }

        let mut outcomes = BTreeMap::new();
        for (key, ids, handle) in handles {
            let error = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{:#}", e)),
                Err(join_error) => Some(format!("remediation task aborted: {}", join_error)),
            };
            let success = error.is_none();
            self.logger.log_remediation(
                &key.provider.to_string(),
                &key.scope,
                &key.action.to_string(),
                &ids,
                success,
                error.as_deref(),
            );
            outcomes.insert(key, success);
        }

        outcomes
    }
}

/// Remediation provider that only records what it would do
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRemediator;

#[async_trait]
impl RemediationProvider for DryRunRemediator {
    async fn apply(&self, key: &RemediationKey, resource_ids: &[String]) -> Result<()> {
        tracing::info!(
            provider = %key.provider,
            scope = %key.scope,
            action = %key.action,
            resource_ids = %resource_ids.join(","),
            "Dry run: remediation not applied"
        );
        Ok(())
    }
}
