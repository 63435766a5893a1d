//! Resource enumeration
//!
//! Every source is listed concurrently and the pass only starts once all of
//! them have answered. A source that fails is reported in the outcome and
//! the pass continues with whatever the remaining sources returned.

mod pass_loop;

pub use pass_loop::{LastReport, PassLoop, PassLoopBuilder, PassLoopConfig};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::models::Resource;
use crate::normalize::ResourceFilter;

/// Provider capability: list every resource of an account
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Short label used in logs and failure reports
    fn name(&self) -> &str;

    async fn list(&self) -> Result<Vec<Resource>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionOutcome {
    /// Filtered resources, in source order
    pub resources: Vec<Resource>,
    pub failed_sources: Vec<SourceFailure>,
    pub sources: usize,
}

impl CollectionOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

pub async fn collect_resources(
    sources: &[Arc<dyn ResourceSource>],
    filter: &ResourceFilter,
) -> CollectionOutcome {
    let handles: Vec<_> = sources
        .iter()
        .map(|source| {
            let source = Arc::clone(source);
            let name = source.name().to_string();
            (name, tokio::spawn(async move { source.list().await }))
        })
        .collect();

    let mut outcome = CollectionOutcome {
        sources: sources.len(),
        ..CollectionOutcome::default()
    };

    for (name, handle) in handles {
        let listed = match handle.await {
            Ok(Ok(resources)) => resources,
            Ok(Err(e)) => {
                outcome.failed_sources.push(SourceFailure {
                    source: name,
                    error: format!("{:#}", e),
                });
                continue;
            }
            Err(join_error) => {
                outcome.failed_sources.push(SourceFailure {
                    source: name,
                    error: format!("listing task aborted: {}", join_error),
                });
                continue;
            }
        };

        let listed_count = listed.len();
        let kept = filter.apply(listed);
        debug!(
            source = %name,
            listed = listed_count,
            kept = kept.len(),
            "Source enumerated"
        );
        outcome.resources.extend(kept);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, ResourceState};
    use std::time::Duration;

    struct StaticSource {
        name: &'static str,
        delay: Duration,
        result: std::result::Result<Vec<Resource>, String>,
    }

    #[async_trait]
    impl ResourceSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn list(&self) -> Result<Vec<Resource>> {
            tokio::time::sleep(self.delay).await;
            self.result.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn resource(id: &str, state: ResourceState) -> Resource {
        Resource::builder(Provider::Aws, id, "us-east-1").state(state).build()
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_collection() {
        let sources: Vec<Arc<dyn ResourceSource>> = vec![
            Arc::new(StaticSource {
                name: "aws",
                delay: Duration::from_millis(20),
                result: Ok(vec![resource("i-1", ResourceState::Running)]),
            }),
            Arc::new(StaticSource {
                name: "gcp",
                delay: Duration::ZERO,
                result: Err("quota exceeded".to_string()),
            }),
            Arc::new(StaticSource {
                name: "azure",
                delay: Duration::ZERO,
                result: Ok(vec![resource("vm-1", ResourceState::Stopped)]),
            }),
        ];

        let outcome = collect_resources(&sources, &ResourceFilter::default()).await;

        assert_eq!(outcome.sources, 3);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failed_sources.len(), 1);
        assert_eq!(outcome.failed_sources[0].source, "gcp");
        assert!(outcome.failed_sources[0].error.contains("quota"));
        // Source order is kept even though aws answers last
        let ids: Vec<_> = outcome.resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "vm-1"]);
    }

    #[tokio::test]
    async fn test_filter_applied_after_listing() {
        let sources: Vec<Arc<dyn ResourceSource>> = vec![Arc::new(StaticSource {
            name: "aws",
            delay: Duration::ZERO,
            result: Ok(vec![
                resource("i-1", ResourceState::Running),
                resource("i-2", ResourceState::Stopped),
            ]),
        })];
        let filter = ResourceFilter {
            states: [ResourceState::Running].into_iter().collect(),
            tag: None,
        };

        let outcome = collect_resources(&sources, &filter).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let outcome = collect_resources(&[], &ResourceFilter::default()).await;
        assert!(outcome.resources.is_empty());
        assert_eq!(outcome.sources, 0);
    }
}
