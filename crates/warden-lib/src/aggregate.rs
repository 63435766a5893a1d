//! Per-owner digests and remediation buckets
//!
//! Both views are built from the fully classified snapshot of a pass:
//! - [`aggregate`] groups notifiable resources by owner, keeping the highest
//!   tier seen for each owner
//! - [`remediation_groups`] buckets critical candidates by provider scope,
//!   independently of whether an owner is known

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::escalation::{ClassifiedResource, EscalationTier};
use crate::models::{Provider, ResourceKind};
use crate::remediation::{RemediationAction, RemediationKey};
use crate::uptime::format_uptime;

/// Display data for one resource inside a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub name: String,
    pub uptime: String,
    pub provider: Provider,
    pub kind: ResourceKind,
    pub secondary_group: Option<String>,
    pub tier: EscalationTier,
}

/// All qualifying resources of one owner for a single pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerDigest {
    pub owner: String,
    /// Maximum tier across every resource contributed
    pub tier: EscalationTier,
    pub groups: BTreeSet<String>,
    /// Region -> resource ids, both in first-observed order
    pub regions: Vec<(String, Vec<String>)>,
    pub entries: HashMap<String, DigestEntry>,
}

impl OwnerDigest {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            tier: EscalationTier::None,
            groups: BTreeSet::new(),
            regions: Vec::new(),
            entries: HashMap::new(),
        }
    }

    fn push(&mut self, item: &ClassifiedResource) {
        let resource = &item.resource;
        if self.entries.contains_key(&resource.id) {
            return;
        }
        let tier = item.tier();

        self.tier = self.tier.max(tier);
        if let Some(group) = &resource.secondary_group {
            self.groups.insert(group.clone());
        }

        match self.regions.iter_mut().find(|(r, _)| *r == resource.region) {
            Some((_, ids)) => ids.push(resource.id.clone()),
            None => self
                .regions
                .push((resource.region.clone(), vec![resource.id.clone()])),
        }

        self.entries.insert(
            resource.id.clone(),
            DigestEntry {
                name: resource.name.clone(),
                uptime: item
                    .classification
                    .uptime
                    .map(format_uptime)
                    .unwrap_or_default(),
                provider: resource.provider,
                kind: resource.kind,
                secondary_group: resource.secondary_group.clone(),
                tier,
            },
        );
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|e| e.name.as_str())
    }

    pub fn uptime(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|e| e.uptime.as_str())
    }

    pub fn resource_count(&self) -> usize {
        self.regions.iter().map(|(_, ids)| ids.len()).sum()
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.regions
            .iter()
            .flat_map(|(_, ids)| ids.iter().map(String::as_str))
    }

    pub fn providers(&self) -> BTreeSet<Provider> {
        self.entries.values().map(|e| e.provider).collect()
    }

    pub fn kinds(&self) -> BTreeSet<ResourceKind> {
        self.entries.values().map(|e| e.kind).collect()
    }
}

/// Build one digest per owner with at least one notifiable resource
///
/// Resources without an owner or with tier `None` are skipped, so an owner
/// never appears with an empty digest.
pub fn aggregate(classified: &[ClassifiedResource]) -> BTreeMap<String, OwnerDigest> {
    let mut digests: BTreeMap<String, OwnerDigest> = BTreeMap::new();

    for item in classified {
        if !item.tier().is_notifiable() {
            continue;
        }
        let Some(owner) = item.resource.owner.as_deref() else {
            continue;
        };
        digests
            .entry(owner.to_string())
            .or_insert_with(|| OwnerDigest::new(owner))
            .push(item);
    }

    digests
}

/// Rules applied when selecting remediation candidates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationPolicy {
    /// Case-insensitive substrings; a resource whose secondary group contains
    /// one of these is never auto-remediated
    pub exempt_groups: Vec<String>,
}

impl RemediationPolicy {
    pub fn with_exempt_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exempt_groups: groups
                .into_iter()
                .map(|g| g.into().to_lowercase())
                .filter(|g| !g.is_empty())
                .collect(),
        }
    }

    pub fn is_exempt(&self, item: &ClassifiedResource) -> bool {
        let Some(group) = &item.resource.secondary_group else {
            return false;
        };
        let group = group.to_lowercase();
        self.exempt_groups
            .iter()
            .any(|g| group.contains(&g.to_lowercase()))
    }
}

/// Remediation buckets, keyed by provider scope and action
pub type RemediationGroups = BTreeMap<RemediationKey, Vec<String>>;

/// Bucket every critical, non-excluded candidate for a batched stop/delete
pub fn remediation_groups(
    classified: &[ClassifiedResource],
    policy: &RemediationPolicy,
) -> RemediationGroups {
    let mut groups = RemediationGroups::new();

    for item in classified {
        let c = &item.classification;
        if !c.remediation_candidate || c.tier != EscalationTier::Critical || item.resource.excluded
        {
            continue;
        }
        if policy.is_exempt(item) {
            tracing::debug!(
                resource_id = %item.resource.id,
                group = ?item.resource.secondary_group,
                "Resource group exempt from remediation"
            );
            continue;
        }

        let key = RemediationKey::for_resource(&item.resource);
        let ids = groups.entry(key).or_default();
        if !ids.contains(&item.resource.id) {
            ids.push(item.resource.id.clone());
        }
    }

    groups
}

/// Split remediation buckets by action, for reporting
pub fn count_by_action(groups: &RemediationGroups) -> BTreeMap<RemediationAction, usize> {
    let mut counts = BTreeMap::new();
    for (key, ids) in groups {
        *counts.entry(key.action).or_insert(0) += ids.len();
    }
    counts
}
