//! CLI subcommands

pub mod audit;
pub mod list;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use warden_lib::{collect_resources, Resource, ResourceFilter, ResourceSource, SnapshotSource};

use crate::config::Config;
use crate::SourceArgs;

/// Enumerate the snapshot and apply the state/tag filters
pub async fn load_resources(source: &SourceArgs, config: &Config) -> Result<Vec<Resource>> {
    let path = config.snapshot(source.snapshot.clone())?;
    let filter = ResourceFilter {
        states: source.states.iter().copied().collect(),
        tag: source.tag.clone(),
    };

    let sources: Vec<Arc<dyn ResourceSource>> = vec![Arc::new(SnapshotSource::new(&path))];
    let outcome = collect_resources(&sources, &filter).await;

    if let Some(failure) = outcome.failed_sources.first() {
        anyhow::bail!(
            "Failed to list resources from {}: {}",
            path.display(),
            failure.error
        );
    }
    info!(
        snapshot = %path.display(),
        resources = outcome.resources.len(),
        "Loaded resources"
    );
    Ok(outcome.resources)
}
