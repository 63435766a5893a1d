//! `wardenctl list`

use anyhow::Result;
use chrono::{DateTime, Utc};
use tabled::Tabled;
use warden_lib::uptime::{format_uptime, uptime};
use warden_lib::{PassSummary, Resource};

use super::load_resources;
use crate::config::Config;
use crate::output::{check_mark, color_state, or_dash, print_json, print_table, OutputFormat};
use crate::SourceArgs;

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Excluded")]
    excluded: String,
}

fn row(resource: &Resource, now: DateTime<Utc>) -> ResourceRow {
    ResourceRow {
        provider: resource.provider.to_string(),
        region: resource.region.clone(),
        group: or_dash(resource.secondary_group.as_deref()),
        id: resource.id.clone(),
        name: resource.name.clone(),
        state: color_state(resource.state),
        uptime: resource
            .launch_time
            .map(|launched| format_uptime(uptime(now, launched)))
            .unwrap_or_else(|| "-".to_string()),
        owner: or_dash(resource.owner.as_deref()),
        excluded: check_mark(resource.excluded),
    }
}

pub async fn list_resources(source: &SourceArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let resources = load_resources(source, config).await?;

    match format {
        OutputFormat::Json => print_json(&resources)?,
        OutputFormat::Table => {
            let now = Utc::now();
            print_table(
                resources.iter().map(|r| row(r, now)).collect(),
                "No resources found",
            );
            println!("\n{}", PassSummary::from_resources(&resources));
        }
    }

    Ok(())
}
