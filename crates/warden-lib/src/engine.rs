//! One escalation pass over a fully enumerated resource set
//!
//! `evaluate` is synchronous and has no side effects beyond logging:
//! classify every resource, fold owner digests, bucket remediation
//! candidates. `run_pass` then hands the digests to the dispatcher and the
//! buckets to the remediation driver, concurrently with each other. The
//! engine keeps no state between passes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{aggregate, remediation_groups, OwnerDigest, RemediationGroups, RemediationPolicy};
use crate::dispatch::Dispatcher;
use crate::escalation::{ClassifiedResource, EscalationTier};
use crate::models::{Resource, ResourceState, Thresholds};
use crate::observability::{StructuredLogger, WardenMetrics};
use crate::remediation::{serialize_buckets, RemediationDriver, RemediationKey};
use crate::uptime::format_uptime;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    /// Dispatch owner digests
    pub notify: bool,
    /// Apply stop/delete to critical buckets
    pub remediate: bool,
    pub policy: RemediationPolicy,
}

impl EngineConfig {
    /// Report-only configuration: nothing is dispatched or remediated
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            notify: false,
            remediate: false,
            policy: RemediationPolicy::default(),
        }
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_remediate(mut self, remediate: bool) -> Self {
        self.remediate = remediate;
        self
    }

    pub fn with_policy(mut self, policy: RemediationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Pure result of classifying and aggregating one resource set
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub classified: Vec<ClassifiedResource>,
    pub digests: BTreeMap<String, OwnerDigest>,
    #[serde(serialize_with = "serialize_buckets")]
    pub remediation: RemediationGroups,
}

/// Resource counts for the pass footer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub total: usize,
    pub by_state: BTreeMap<ResourceState, usize>,
    pub by_tier: BTreeMap<EscalationTier, usize>,
}

impl PassSummary {
    pub fn from_classified(classified: &[ClassifiedResource]) -> Self {
        let mut summary = Self::default();
        for item in classified {
            summary.count(&item.resource);
            *summary.by_tier.entry(item.tier()).or_insert(0) += 1;
        }
        summary
    }

    /// State counts only, for listings that were never classified
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut summary = Self::default();
        for resource in resources {
            summary.count(resource);
        }
        summary
    }

    fn count(&mut self, resource: &Resource) {
        self.total += 1;
        *self.by_state.entry(resource.state).or_insert(0) += 1;
    }

    pub fn count_state(&self, state: ResourceState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }

    pub fn count_tier(&self, tier: EscalationTier) -> usize {
        self.by_tier.get(&tier).copied().unwrap_or(0)
    }
}

impl fmt::Display for PassSummary {
    /// `Resources: 5 (running: 3, stopped: 2)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resources: {}", self.total)?;
        if !self.by_state.is_empty() {
            let states: Vec<String> = self
                .by_state
                .iter()
                .map(|(state, count)| format!("{}: {}", state, count))
                .collect();
            write!(f, " ({})", states.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub evaluation: Evaluation,
    pub notifications: BTreeMap<String, bool>,
    #[serde(serialize_with = "serialize_buckets")]
    pub remediations: BTreeMap<RemediationKey, bool>,
    pub summary: PassSummary,
}

impl PassReport {
    pub fn failed_notifications(&self) -> usize {
        self.notifications.values().filter(|ok| !**ok).count()
    }

    pub fn failed_remediations(&self) -> usize {
        self.remediations.values().filter(|ok| !**ok).count()
    }
}

pub struct Engine {
    config: EngineConfig,
    logger: StructuredLogger,
    metrics: WardenMetrics,
}

impl Engine {
    pub fn new(config: EngineConfig, logger: StructuredLogger) -> Self {
        Self {
            config,
            logger,
            metrics: WardenMetrics::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn metrics(&self) -> &WardenMetrics {
        &self.metrics
    }

    pub fn evaluate<I>(&self, resources: I, now: DateTime<Utc>) -> Evaluation
    where
        I: IntoIterator<Item = Resource>,
    {
        let classified: Vec<ClassifiedResource> = resources
            .into_iter()
            .map(|resource| ClassifiedResource::new(resource, now, &self.config.thresholds))
            .collect();

        for item in &classified {
            let c = &item.classification;
            if !c.tier.is_notifiable() {
                continue;
            }
            let uptime = c.uptime.map(format_uptime).unwrap_or_default();
            self.logger.log_classification(
                &item.resource.id,
                &item.resource.provider.to_string(),
                &item.resource.region,
                item.resource.owner.as_deref(),
                c.tier,
                &uptime,
                c.remediation_candidate,
            );
        }

        let digests = aggregate(&classified);
        let remediation = remediation_groups(&classified, &self.config.policy);

        Evaluation {
            classified,
            digests,
            remediation,
        }
    }

    /// Evaluate, then dispatch and remediate as configured
    pub async fn run_pass<I>(
        &self,
        resources: I,
        now: DateTime<Utc>,
        dispatcher: &Dispatcher,
        driver: &RemediationDriver,
    ) -> PassReport
    where
        I: IntoIterator<Item = Resource>,
    {
        let start = Instant::now();
        let resources: Vec<Resource> = resources.into_iter().collect();
        self.logger.log_pass_started(resources.len());

        let evaluation = self.evaluate(resources, now);

        let notify = async {
            if self.config.notify {
                dispatcher.dispatch(&evaluation.digests).await
            } else {
                BTreeMap::new()
            }
        };
        let remediate = async {
            if self.config.remediate {
                driver.remediate(&evaluation.remediation).await
            } else {
                BTreeMap::new()
            }
        };
        let (notifications, remediations) = tokio::join!(notify, remediate);

        let summary = PassSummary::from_classified(&evaluation.classified);
        self.record_metrics(&summary, &evaluation, &notifications, &remediations);

        let elapsed = start.elapsed();
        self.metrics.observe_pass_latency(elapsed.as_secs_f64());
        self.logger.log_pass_completed(
            summary.total,
            evaluation.digests.len(),
            evaluation.remediation.len(),
            elapsed.as_millis(),
        );

        PassReport {
            evaluation,
            notifications,
            remediations,
            summary,
        }
    }

    fn record_metrics(
        &self,
        summary: &PassSummary,
        evaluation: &Evaluation,
        notifications: &BTreeMap<String, bool>,
        remediations: &BTreeMap<RemediationKey, bool>,
    ) {
        self.metrics.set_resources_seen(summary.total as i64);
        self.metrics.set_tier_counts(&summary.by_tier);
        self.metrics
            .set_owners_notifiable(evaluation.digests.len() as i64);
        for ok in notifications.values() {
            self.metrics.record_notification(*ok);
        }
        for ok in remediations.values() {
            self.metrics.record_remediation(*ok);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Notifier;
    use crate::models::Provider;
    use crate::remediation::RemediationProvider;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _: EscalationTier, _: &str, _: &OwnerDigest) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemediationProvider for CountingProvider {
        async fn apply(&self, _: &RemediationKey, _: &[String]) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn resources() -> Vec<Resource> {
        vec![
            Resource::builder(Provider::Aws, "i-1", "us-east-1")
                .state(ResourceState::Running)
                .launch_time(Some(now() - Duration::hours(30)))
                .owner(Some("alice".to_string()))
                .build(),
            Resource::builder(Provider::Aws, "i-2", "us-east-1")
                .state(ResourceState::Stopped)
                .owner(Some("bob".to_string()))
                .build(),
        ]
    }

    fn config() -> EngineConfig {
        EngineConfig::new(Thresholds::from_hours(12.0, 24.0).unwrap())
    }

    #[test]
    fn test_evaluate() {
        let engine = Engine::new(config(), StructuredLogger::new("test"));
        let evaluation = engine.evaluate(resources(), now());

        assert_eq!(evaluation.classified.len(), 2);
        assert_eq!(evaluation.digests.len(), 1);
        assert_eq!(evaluation.digests["alice"].tier, EscalationTier::Critical);
        assert_eq!(evaluation.remediation.len(), 1);
    }

    #[test]
    fn test_summary_footer() {
        let engine = Engine::new(config(), StructuredLogger::new("test"));
        let evaluation = engine.evaluate(resources(), now());
        let summary = PassSummary::from_classified(&evaluation.classified);

        assert_eq!(summary.count_state(ResourceState::Running), 1);
        assert_eq!(summary.count_tier(EscalationTier::None), 1);
        assert_eq!(summary.count_tier(EscalationTier::Critical), 1);
        assert_eq!(summary.to_string(), "Resources: 2 (running: 1, stopped: 1)");
        assert_eq!(PassSummary::default().to_string(), "Resources: 0");
    }

    #[tokio::test]
    async fn test_flags_gate_side_effects() {
        let notifier = Arc::new(CountingNotifier::default());
        let provider = Arc::new(CountingProvider::default());
        let dispatcher = Dispatcher::new(notifier.clone(), StructuredLogger::new("test"));
        let driver = RemediationDriver::new(provider.clone(), StructuredLogger::new("test"));

        let quiet = Engine::new(config(), StructuredLogger::new("test"));
        let report = quiet.run_pass(resources(), now(), &dispatcher, &driver).await;
        assert!(report.notifications.is_empty());
        assert!(report.remediations.is_empty());
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let active = Engine::new(
            config().with_notify(true).with_remediate(true),
            StructuredLogger::new("test"),
        );
        let report = active.run_pass(resources(), now(), &dispatcher, &driver).await;
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.remediations.len(), 1);
        assert_eq!(report.failed_notifications(), 0);
        assert_eq!(report.failed_remediations(), 0);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let dispatcher = Dispatcher::new(
            Arc::new(CountingNotifier::default()),
            StructuredLogger::new("test"),
        );
        let driver = RemediationDriver::new(
            Arc::new(CountingProvider::default()),
            StructuredLogger::new("test"),
        );
        let engine = Engine::new(config().with_remediate(true), StructuredLogger::new("test"));
        let report = engine.run_pass(resources(), now(), &dispatcher, &driver).await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["remediations"][0][0]["scope"], "us-east-1");
        assert_eq!(json["remediations"][0][1], true);
    }
}
