//! Observability infrastructure for the warden
//!
//! Provides:
//! - Prometheus metrics (pass latency, resources per tier, dispatch and remediation outcomes)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, register_int_gauge_vec,
    Histogram, IntCounter, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::escalation::EscalationTier;

/// Histogram buckets for pass latency (in seconds); passes are dominated by provider I/O
const PASS_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<WardenMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct WardenMetricsInner {
    pass_latency_seconds: Histogram,
    passes_completed: IntCounter,
    resources_seen: IntGauge,
    resources_by_tier: IntGaugeVec,
    owners_notifiable: IntGauge,
    notifications_sent: IntCounter,
    notifications_failed: IntCounter,
    remediation_groups_succeeded: IntCounter,
    remediation_groups_failed: IntCounter,
    source_errors: IntCounter,
}

impl WardenMetricsInner {
    fn new() -> Self {
        Self {
            pass_latency_seconds: register_histogram!(
                "uptime_warden_pass_latency_seconds",
                "Time spent on one enumerate-classify-dispatch pass",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),

            passes_completed: register_int_counter!(
                "uptime_warden_passes_completed_total",
                "Total number of completed passes"
            )
            .expect("Failed to register passes_completed"),

            resources_seen: register_int_gauge!(
                "uptime_warden_resources_seen",
                "Number of resources enumerated in the last pass"
            )
            .expect("Failed to register resources_seen"),

            resources_by_tier: register_int_gauge_vec!(
                "uptime_warden_resources_by_tier",
                "Number of resources per escalation tier in the last pass",
                &["tier"]
            )
            .expect("Failed to register resources_by_tier"),

            owners_notifiable: register_int_gauge!(
                "uptime_warden_owners_notifiable",
                "Number of owners with a digest in the last pass"
            )
            .expect("Failed to register owners_notifiable"),

            notifications_sent: register_int_counter!(
                "uptime_warden_notifications_sent_total",
                "Total number of owner notifications delivered"
            )
            .expect("Failed to register notifications_sent"),

            notifications_failed: register_int_counter!(
                "uptime_warden_notifications_failed_total",
                "Total number of owner notifications that failed"
            )
            .expect("Failed to register notifications_failed"),

            remediation_groups_succeeded: register_int_counter!(
                "uptime_warden_remediation_groups_succeeded_total",
                "Total number of remediation buckets applied successfully"
            )
            .expect("Failed to register remediation_groups_succeeded"),

            remediation_groups_failed: register_int_counter!(
                "uptime_warden_remediation_groups_failed_total",
                "Total number of remediation buckets that failed"
            )
            .expect("Failed to register remediation_groups_failed"),

            source_errors: register_int_counter!(
                "uptime_warden_source_errors_total",
                "Total number of resource source enumeration failures"
            )
            .expect("Failed to register source_errors"),
        }
    }
}

/// Warden metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct WardenMetrics {
    _private: (),
}

impl Default for WardenMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WardenMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(WardenMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &WardenMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
        self.inner().passes_completed.inc();
    }

    pub fn set_resources_seen(&self, count: i64) {
        self.inner().resources_seen.set(count);
    }

    /// Update the per-tier gauge; tiers missing from `counts` are reset to zero
    pub fn set_tier_counts<'a, I>(&self, counts: I)
    where
        I: IntoIterator<Item = (&'a EscalationTier, &'a usize)>,
    {
        for tier in EscalationTier::ALL {
            self.inner()
                .resources_by_tier
                .with_label_values(&[tier.as_str()])
                .set(0);
        }
        for (tier, count) in counts {
            self.inner()
                .resources_by_tier
                .with_label_values(&[tier.as_str()])
                .set(*count as i64);
        }
    }

    pub fn set_owners_notifiable(&self, count: i64) {
        self.inner().owners_notifiable.set(count);
    }

    pub fn record_notification(&self, success: bool) {
        if success {
            self.inner().notifications_sent.inc();
        } else {
            self.inner().notifications_failed.inc();
        }
    }

    pub fn record_remediation(&self, success: bool) {
        if success {
            self.inner().remediation_groups_succeeded.inc();
        } else {
            self.inner().remediation_groups_failed.inc();
        }
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }
}

/// Structured logger for warden events
///
/// Provides consistent JSON-formatted logging for classifications,
/// notifications, remediation and pass lifecycle.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    account: String,
}

impl StructuredLogger {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn log_pass_started(&self, resources: usize) {
        info!(
            event = "pass_started",
            account = %self.account,
            resources = resources,
            "Starting escalation pass"
        );
    }

    /// Log a resource that reached a notifiable tier
    pub fn log_classification(
        &self,
        resource_id: &str,
        provider: &str,
        region: &str,
        owner: Option<&str>,
        tier: EscalationTier,
        uptime: &str,
        remediation_candidate: bool,
    ) {
        match tier {
            EscalationTier::Critical => {
                warn!(
                    event = "resource_classified",
                    account = %self.account,
                    resource_id = %resource_id,
                    provider = %provider,
                    region = %region,
                    owner = ?owner,
                    tier = %tier,
                    uptime = %uptime,
                    remediation_candidate = remediation_candidate,
                    "Resource past critical threshold"
                );
            }
            EscalationTier::None => {}
            _ => {
                debug!(
                    event = "resource_classified",
                    account = %self.account,
                    resource_id = %resource_id,
                    provider = %provider,
                    region = %region,
                    owner = ?owner,
                    tier = %tier,
                    uptime = %uptime,
                    "Resource classified"
                );
            }
        }
    }

    /// Log the outcome of one owner notification
    pub fn log_notification(
        &self,
        owner: &str,
        tier: EscalationTier,
        resources: usize,
        success: bool,
        error: Option<&str>,
    ) {
        if success {
            info!(
                event = "notification_dispatched",
                account = %self.account,
                owner = %owner,
                tier = %tier,
                resources = resources,
                "Owner notified"
            );
        } else {
            warn!(
                event = "notification_failed",
                account = %self.account,
                owner = %owner,
                tier = %tier,
                resources = resources,
                error = ?error,
                "Owner notification failed"
            );
        }
    }

    /// Log the outcome of one remediation bucket
    pub fn log_remediation(
        &self,
        provider: &str,
        scope: &str,
        action: &str,
        resource_ids: &[String],
        success: bool,
        error: Option<&str>,
    ) {
        if success {
            info!(
                event = "remediation_applied",
                account = %self.account,
                provider = %provider,
                scope = %scope,
                action = %action,
                resource_ids = %resource_ids.join(","),
                "Remediation applied"
            );
        } else {
            warn!(
                event = "remediation_failed",
                account = %self.account,
                provider = %provider,
                scope = %scope,
                action = %action,
                resource_ids = %resource_ids.join(","),
                error = ?error,
                "Remediation failed"
            );
        }
    }

    pub fn log_pass_completed(
        &self,
        resources: usize,
        owners: usize,
        remediation_groups: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "pass_completed",
            account = %self.account,
            resources = resources,
            owners = owners,
            remediation_groups = remediation_groups,
            elapsed_ms = elapsed_ms,
            "Escalation pass complete"
        );
    }

    pub fn log_source_failure(&self, source: &str, error: &str) {
        warn!(
            event = "source_failed",
            account = %self.account,
            source = %source,
            error = %error,
            "Resource source enumeration failed"
        );
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "warden_started",
            account = %self.account,
            version = %version,
            "Uptime warden started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "warden_shutdown",
            account = %self.account,
            reason = %reason,
            "Uptime warden shutting down"
        );
    }
}
