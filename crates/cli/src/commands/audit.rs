//! `wardenctl audit`: one escalation pass over a snapshot

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tabled::Tabled;
use warden_lib::aggregate::count_by_action;
use warden_lib::uptime::format_uptime;
use warden_lib::{
    AlertComposer, AlertSettings, Dispatcher, DryRunRemediator, Engine, EngineConfig,
    LogNotifier, PassReport, RemediationDriver, RemediationGroups, RemediationPolicy,
    StructuredLogger,
};

use super::load_resources;
use crate::config::Config;
use crate::output::{
    check_mark, color_outcome, color_state, color_tier, or_dash, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};
use crate::SourceArgs;

/// Flags specific to `audit`
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub warning_hours: Option<f64>,
    pub critical_hours: Option<f64>,
    pub notify: bool,
    pub remediate: bool,
    pub exempt_groups: Vec<String>,
    pub account: Option<String>,
    pub show_alerts: bool,
}

#[derive(Tabled)]
struct ClassifiedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Remediate")]
    remediate: String,
}

#[derive(Tabled)]
struct DigestRow {
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Groups")]
    groups: String,
    #[tabled(rename = "Notified")]
    notified: String,
}

#[derive(Tabled)]
struct RemediationRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resources")]
    resources: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// Merge flags over the config file into alert settings and engine config
fn build_settings(options: &AuditOptions, config: &Config) -> Result<(EngineConfig, AlertSettings)> {
    let thresholds = config.thresholds(options.warning_hours, options.critical_hours)?;

    let exempt = if options.exempt_groups.is_empty() {
        config.exempt_groups.clone()
    } else {
        options.exempt_groups.clone()
    };
    let engine_config = EngineConfig::new(thresholds)
        .with_notify(options.notify)
        .with_remediate(options.remediate)
        .with_policy(RemediationPolicy::with_exempt_groups(exempt));

    let mut settings = AlertSettings::new(thresholds);
    if let Some(account) = options.account.as_ref().or(config.account.as_ref()) {
        settings.account = account.clone();
    }
    if let Some(domain) = &config.email_domain {
        settings.email_domain = domain.clone();
    }
    if let Some(sender) = &config.sender {
        settings.sender = sender.clone();
    }
    settings.heads = config
        .heads
        .iter()
        .map(|(dept, cc)| (dept.to_lowercase(), cc.clone()))
        .collect();
    settings.remediation_enabled = options.remediate;

    Ok((engine_config, settings))
}

/// `Remediation candidates: stop 2, delete 1`, or nothing when no bucket exists
fn remediation_footer(groups: &RemediationGroups) -> Option<String> {
    let counts = count_by_action(groups);
    if counts.is_empty() {
        return None;
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(action, count)| format!("{} {}", action, count))
        .collect();
    Some(format!("Remediation candidates: {}", parts.join(", ")))
}

pub async fn run_audit(
    source: &SourceArgs,
    options: &AuditOptions,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (engine_config, settings) = build_settings(options, config)?;
    let resources = load_resources(source, config).await?;

    let logger = StructuredLogger::new(&settings.account);
    let composer = AlertComposer::new(settings);
    let engine = Engine::new(engine_config, logger.clone());
    let dispatcher = Dispatcher::new(Arc::new(LogNotifier::new(composer.clone())), logger.clone());
    let driver = RemediationDriver::new(Arc::new(DryRunRemediator), logger);

    let report = engine
        .run_pass(resources, Utc::now(), &dispatcher, &driver)
        .await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, options),
    }

    if options.show_alerts {
        print_alerts(&report, &composer);
    }

    Ok(())
}

fn print_report(report: &PassReport, options: &AuditOptions) {
    let evaluation = &report.evaluation;

    let rows: Vec<ClassifiedRow> = evaluation
        .classified
        .iter()
        .map(|item| ClassifiedRow {
            id: item.resource.id.clone(),
            provider: item.resource.provider.to_string(),
            region: item.resource.region.clone(),
            owner: or_dash(item.resource.owner.as_deref()),
            state: color_state(item.resource.state),
            uptime: item
                .classification
                .uptime
                .map(format_uptime)
                .unwrap_or_else(|| "-".to_string()),
            tier: color_tier(item.tier()),
            remediate: check_mark(item.classification.remediation_candidate),
        })
        .collect();
    print_table(rows, "No resources found");

    println!();
    let digests: Vec<DigestRow> = evaluation
        .digests
        .values()
        .map(|digest| DigestRow {
            owner: digest.owner.clone(),
            tier: color_tier(digest.tier),
            resources: digest.resource_count(),
            groups: digest.groups.iter().cloned().collect::<Vec<_>>().join(", "),
            notified: report
                .notifications
                .get(&digest.owner)
                .map(|ok| color_outcome(*ok))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(digests, "No owner digests");

    println!();
    let buckets: Vec<RemediationRow> = evaluation
        .remediation
        .iter()
        .map(|(key, ids)| RemediationRow {
            provider: key.provider.to_string(),
            scope: key.scope.clone(),
            action: key.action.to_string(),
            resources: ids.join(", "),
            result: report
                .remediations
                .get(key)
                .map(|ok| color_outcome(*ok))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(buckets, "No remediation candidates");

    println!();
    print_info(&report.summary.to_string());
    if let Some(footer) = remediation_footer(&evaluation.remediation) {
        print_info(&footer);
    }
    if options.notify {
        print_success(&format!(
            "{} of {} owners notified",
            report.notifications.len() - report.failed_notifications(),
            report.notifications.len()
        ));
    }
    if options.remediate {
        print_warning("Remediation ran in dry-run mode; no provider backend is linked");
    }
}

fn print_alerts(report: &PassReport, composer: &AlertComposer) {
    for (owner, digest) in &report.evaluation.digests {
        let alert = composer.compose(digest.tier, owner, digest);
        println!();
        println!("From:    {}", alert.sender);
        println!("To:      {}", alert.recipient);
        if !alert.cc.is_empty() {
            println!("Cc:      {}", alert.cc.join(", "));
        }
        println!("Subject: {}", alert.subject);
        println!();
        println!("{}", alert.body);
    }
}
