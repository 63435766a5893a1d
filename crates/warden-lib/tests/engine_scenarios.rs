//! End-to-end passes over hand-built resource sets

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use warden_lib::{
    aggregate, Dispatcher, Engine, EngineConfig, EscalationTier, Notifier, OwnerDigest, Provider,
    RemediationAction, RemediationDriver, RemediationKey, RemediationPolicy, RemediationProvider,
    Resource, ResourceKind, ResourceState, StructuredLogger, Thresholds,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn thresholds() -> Thresholds {
    Thresholds::from_hours(12.0, 24.0).unwrap()
}

fn running(provider: Provider, id: &str, region: &str, owner: &str, hours: i64) -> Resource {
    Resource::builder(provider, id, region)
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(hours)))
        .owner(Some(owner.to_string()))
        .build()
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(EscalationTier, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, tier: EscalationTier, owner: &str, _: &OwnerDigest) -> Result<()> {
        self.calls.lock().unwrap().push((tier, owner.to_string()));
        Ok(())
    }
}

struct ScopedProvider {
    failing_scope: &'static str,
    calls: Mutex<Vec<RemediationKey>>,
}

#[async_trait]
impl RemediationProvider for ScopedProvider {
    async fn apply(&self, key: &RemediationKey, _ids: &[String]) -> Result<()> {
        self.calls.lock().unwrap().push(key.clone());
        if key.scope == self.failing_scope {
            anyhow::bail!("permission denied in {}", key.scope);
        }
        Ok(())
    }
}

fn engine(config: EngineConfig) -> Engine {
    Engine::new(config, StructuredLogger::new("scenario"))
}

#[test]
fn test_owner_tier_is_max_over_resources() {
    let resources = vec![
        running(Provider::Aws, "A", "us-east-1", "alice", 30),
        running(Provider::Aws, "B", "eu-west-1", "alice", 13),
    ];
    let evaluation = engine(EngineConfig::new(thresholds())).evaluate(resources, now());

    let classified = &evaluation.classified;
    assert_eq!(classified[0].tier(), EscalationTier::Critical);
    assert!(classified[0].classification.remediation_candidate);
    assert_eq!(classified[1].tier(), EscalationTier::Warning);
    assert!(!classified[1].classification.remediation_candidate);

    let alice = &evaluation.digests["alice"];
    assert_eq!(alice.tier, EscalationTier::Critical);
    assert_eq!(
        alice.regions,
        vec![
            ("us-east-1".to_string(), vec!["A".to_string()]),
            ("eu-west-1".to_string(), vec!["B".to_string()]),
        ]
    );
}

#[test]
fn test_excluded_owner_absent_from_digests() {
    let bob = Resource::builder(Provider::Aws, "C", "us-east-1")
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(40)))
        .owner(Some("bob".to_string()))
        .excluded(true)
        .build();
    let evaluation = engine(EngineConfig::new(thresholds())).evaluate(vec![bob], now());

    assert_eq!(evaluation.classified[0].tier(), EscalationTier::None);
    assert!(!evaluation.classified[0].classification.remediation_candidate);
    assert!(!evaluation.digests.contains_key("bob"));
    assert!(evaluation.remediation.is_empty());
}

#[test]
fn test_stopped_resource_never_escalates() {
    let stopped = Resource::builder(Provider::Gcp, "D", "us-central1")
        .state(ResourceState::Stopped)
        .launch_time(Some(now() - Duration::days(90)))
        .owner(Some("dave".to_string()))
        .build();
    let evaluation = engine(EngineConfig::new(thresholds())).evaluate(vec![stopped], now());

    assert_eq!(evaluation.classified[0].tier(), EscalationTier::None);
    assert!(!evaluation.classified[0].classification.remediation_candidate);
    assert!(evaluation.digests.is_empty());
}

#[tokio::test]
async fn test_remediation_failure_isolated_per_group() {
    // Same region, distinct resource groups
    let erin = Resource::builder(Provider::Azure, "vm-erin", "westeurope")
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(48)))
        .owner(Some("erin".to_string()))
        .secondary_group(Some("qa-rg".to_string()))
        .build();
    let finn = Resource::builder(Provider::Azure, "vm-finn", "westeurope")
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(36)))
        .owner(Some("finn".to_string()))
        .secondary_group(Some("dev-rg".to_string()))
        .build();

    let provider = Arc::new(ScopedProvider {
        failing_scope: "qa-rg",
        calls: Mutex::new(Vec::new()),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Dispatcher::new(notifier.clone(), StructuredLogger::new("scenario"));
    let driver = RemediationDriver::new(provider.clone(), StructuredLogger::new("scenario"));

    let config = EngineConfig::new(thresholds())
        .with_notify(true)
        .with_remediate(true);
    let report = engine(config)
        .run_pass(vec![erin, finn], now(), &dispatcher, &driver)
        .await;

    let qa = RemediationKey::new(Provider::Azure, "qa-rg", RemediationAction::Stop);
    let dev = RemediationKey::new(Provider::Azure, "dev-rg", RemediationAction::Stop);
    assert_eq!(report.evaluation.remediation.len(), 2);
    assert_eq!(report.evaluation.remediation[&qa], vec!["vm-erin".to_string()]);
    assert!(!report.remediations[&qa]);
    assert!(report.remediations[&dev]);
    assert_eq!(provider.calls.lock().unwrap().len(), 2);

    assert_eq!(report.notifications.len(), 2);
    assert!(report.notifications.values().all(|ok| *ok));
}

#[test]
fn test_exempt_group_is_reported_but_not_remediated() {
    let sales = Resource::builder(Provider::Azure, "vm-s", "westeurope")
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(72)))
        .owner(Some("gina".to_string()))
        .secondary_group(Some("EMEA-Sales-rg".to_string()))
        .build();
    let config = EngineConfig::new(thresholds())
        .with_policy(RemediationPolicy::with_exempt_groups(["sales"]));
    let evaluation = engine(config).evaluate(vec![sales], now());

    assert_eq!(evaluation.digests["gina"].tier, EscalationTier::Critical);
    assert!(evaluation.remediation.is_empty());
}

#[test]
fn test_clusters_are_deleted_instances_stopped() {
    let cluster = Resource::builder(Provider::Azure, "hdi-1", "northeurope")
        .kind(ResourceKind::Cluster)
        .state(ResourceState::Running)
        .launch_time(Some(now() - Duration::hours(25)))
        .owner(Some("hana".to_string()))
        .secondary_group(Some("bi-rg".to_string()))
        .build();
    let instance = running(Provider::Aws, "i-9", "us-east-1", "hana", 25);
    let evaluation = engine(EngineConfig::new(thresholds())).evaluate(vec![cluster, instance], now());

    let actions: BTreeSet<_> = evaluation.remediation.keys().map(|k| k.action).collect();
    assert_eq!(
        actions,
        [RemediationAction::Stop, RemediationAction::Delete]
            .into_iter()
            .collect()
    );
}

#[test]
fn test_evaluation_is_idempotent() {
    let resources = vec![
        running(Provider::Aws, "A", "us-east-1", "alice", 30),
        running(Provider::Gcp, "B", "us-central1", "bob", 3),
        running(Provider::Aws, "C", "us-east-1", "alice", 14),
    ];
    let engine = engine(EngineConfig::new(thresholds()));

    let first = engine.evaluate(resources.clone(), now());
    let second = engine.evaluate(resources, now());
    assert_eq!(first.digests, second.digests);
    assert_eq!(first.remediation, second.remediation);
}

#[test]
fn test_aggregate_is_commutative() {
    let resources = vec![
        running(Provider::Aws, "A", "us-east-1", "alice", 30),
        running(Provider::Gcp, "B", "us-central1", "bob", 3),
        running(Provider::Aws, "C", "us-east-1", "alice", 14),
        running(Provider::Aws, "D", "eu-west-1", "bob", 20),
    ];
    let engine = engine(EngineConfig::new(thresholds()));

    let forward = engine.evaluate(resources.clone(), now());
    let mut reversed_input = resources;
    reversed_input.reverse();
    let reversed = engine.evaluate(reversed_input, now());

    let forward = aggregate(&forward.classified);
    let reversed = aggregate(&reversed.classified);
    assert_eq!(forward.keys().collect::<Vec<_>>(), reversed.keys().collect::<Vec<_>>());
    for (owner, digest) in &forward {
        let other = &reversed[owner];
        assert_eq!(digest.tier, other.tier);
        assert_eq!(digest.entries, other.entries);
        let ids: BTreeSet<_> = digest.resource_ids().collect();
        let other_ids: BTreeSet<_> = other.resource_ids().collect();
        assert_eq!(ids, other_ids);
    }
}

#[tokio::test]
async fn test_one_notification_per_owner() {
    let resources = vec![
        running(Provider::Aws, "A", "us-east-1", "alice", 30),
        running(Provider::Aws, "B", "eu-west-1", "alice", 13),
        running(Provider::Gcp, "C", "us-central1", "bob", 1),
    ];
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Dispatcher::new(notifier.clone(), StructuredLogger::new("scenario"));
    let driver = RemediationDriver::new(
        Arc::new(warden_lib::DryRunRemediator),
        StructuredLogger::new("scenario"),
    );

    let report = engine(EngineConfig::new(thresholds()).with_notify(true))
        .run_pass(resources, now(), &dispatcher, &driver)
        .await;

    let mut calls = notifier.calls.lock().unwrap().clone();
    calls.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        calls,
        vec![
            (EscalationTier::Critical, "alice".to_string()),
            (EscalationTier::Info, "bob".to_string()),
        ]
    );
    assert!(report.remediations.is_empty());
    assert_eq!(report.summary.total, 3);
}
