//! Provider-native records to normalized resources
//!
//! Each provider module mirrors the shape of what its SDK collaborator
//! returns and maps it onto [`Resource`]. All provider differences (state
//! vocabulary, how owners and launch times are found, what marks a resource
//! as excluded) stay inside this module.

pub mod aws;
pub mod azure;
pub mod gcp;
mod snapshot;

pub use snapshot::{Snapshot, SnapshotSource};

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::{Resource, ResourceState};

/// Provider capability: find who last created or started a resource
pub trait ActorResolver {
    fn last_actor(&self, resource_id: &str) -> Option<String>;
}

/// Strip the mail domain from a caller identity (`jane.doe@corp.com` -> `jane.doe`)
pub(crate) fn actor_name(caller: &str) -> Option<String> {
    let name = caller.split('@').next().unwrap_or(caller).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Tag selection: `key` (tag present and non-empty) or `key:value` (exact match)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub key: String,
    pub value: Option<String>,
}

impl TagFilter {
    pub fn matches(&self, resource: &Resource) -> bool {
        match (resource.tags.get(&self.key), &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(actual), None) => !actual.is_empty(),
            (None, _) => false,
        }
    }
}

impl FromStr for TagFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once(':') {
            Some((k, v)) => (k, Some(v)),
            None => (s, None),
        };
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidTagFilter(s.to_string()));
        }
        Ok(Self {
            key: key.trim().to_string(),
            value: value.filter(|v| !v.is_empty()).map(String::from),
        })
    }
}

/// Narrows an enumeration to the states and tags an operator asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    /// Empty means every state
    pub states: BTreeSet<ResourceState>,
    pub tag: Option<TagFilter>,
}

impl ResourceFilter {
    pub fn matches(&self, resource: &Resource) -> bool {
        if !self.states.is_empty() && !self.states.contains(&resource.state) {
            return false;
        }
        match &self.tag {
            Some(tag) => tag.matches(resource),
            None => true,
        }
    }

    pub fn apply(&self, resources: Vec<Resource>) -> Vec<Resource> {
        resources.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    fn tagged(state: ResourceState, tags: &[(&str, &str)]) -> Resource {
        let mut builder = Resource::builder(Provider::Aws, "i-1", "us-east-1").state(state);
        for (k, v) in tags {
            builder = builder.tag(*k, *v);
        }
        builder.build()
    }

    #[test]
    fn test_actor_name() {
        assert_eq!(actor_name("jane.doe@corp.com").as_deref(), Some("jane.doe"));
        assert_eq!(actor_name("svc").as_deref(), Some("svc"));
        assert_eq!(actor_name("@corp.com"), None);
    }

    #[test]
    fn test_tag_filter_parse() {
        let key_only: TagFilter = "Team".parse().unwrap();
        assert_eq!(key_only.value, None);

        let pair: TagFilter = "Team:qa".parse().unwrap();
        assert_eq!(pair.key, "Team");
        assert_eq!(pair.value.as_deref(), Some("qa"));

        assert!(":qa".parse::<TagFilter>().is_err());
    }

    #[test]
    fn test_tag_filter_matches() {
        let resource = tagged(ResourceState::Running, &[("Team", "qa"), ("Empty", "")]);
        assert!("Team".parse::<TagFilter>().unwrap().matches(&resource));
        assert!("Team:qa".parse::<TagFilter>().unwrap().matches(&resource));
        assert!(!"Team:dev".parse::<TagFilter>().unwrap().matches(&resource));
        assert!(!"Empty".parse::<TagFilter>().unwrap().matches(&resource));
        assert!(!"Missing".parse::<TagFilter>().unwrap().matches(&resource));
    }

    #[test]
    fn test_resource_filter_states() {
        let filter = ResourceFilter {
            states: [ResourceState::Running].into_iter().collect(),
            tag: None,
        };
        let kept = filter.apply(vec![
            tagged(ResourceState::Running, &[]),
            tagged(ResourceState::Stopped, &[]),
        ]);
        assert_eq!(kept.len(), 1);
        assert!(ResourceFilter::default().matches(&tagged(ResourceState::Unknown, &[])));
    }
}
