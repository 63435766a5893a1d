//! Owner notification dispatch
//!
//! This module provides:
//! - The `Notifier` boundary implemented by mail/chat collaborators
//! - A dispatcher issuing exactly one notification per owner digest
//! - Alert composition (recipient, CC, subject, body) for transports

mod alert;

pub use alert::{Alert, AlertComposer, AlertSettings};

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::aggregate::OwnerDigest;
use crate::escalation::EscalationTier;
use crate::observability::StructuredLogger;

/// Transport-agnostic notification boundary
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one digest to its owner at the given tier
    async fn notify(&self, tier: EscalationTier, owner: &str, digest: &OwnerDigest) -> Result<()>;
}

/// Sends one notification per owner, at the owner's maximum tier
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    logger: StructuredLogger,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, logger: StructuredLogger) -> Self {
        Self { notifier, logger }
    }

    /// Notify every owner concurrently and report delivery per owner
    ///
    /// A failed notification never prevents the remaining owners from being
    /// notified.
    pub async fn dispatch(&self, digests: &BTreeMap<String, OwnerDigest>) -> BTreeMap<String, bool> {
        let mut handles = Vec::with_capacity(digests.len());

        for (owner, digest) in digests {
            if digest.resource_count() == 0 {
                continue;
            }
            let notifier = Arc::clone(&self.notifier);
            let task_owner = owner.clone();
            let task_digest = digest.clone();
            let handle = tokio::spawn(async move {
                notifier
                    .notify(task_digest.tier, &task_owner, &task_digest)
                    .await
            });
            handles.push((owner.clone(), digest.tier, digest.resource_count(), handle));
        }

        let mut outcomes = BTreeMap::new();
        for (owner, tier, resources, handle) in handles {
            let error = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{:#}", e)),
                Err(join_error) => Some(format!("notification task aborted: {}", join_error)),
            };
            let success = error.is_none();
            self.logger
                .log_notification(&owner, tier, resources, success, error.as_deref());
            outcomes.insert(owner, success);
        }

        outcomes
    }
}

/// Notifier that composes the alert and writes it to the log instead of
/// handing it to a mail transport
pub struct LogNotifier {
    composer: AlertComposer,
}

impl LogNotifier {
    pub fn new(composer: AlertComposer) -> Self {
        Self { composer }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, tier: EscalationTier, owner: &str, digest: &OwnerDigest) -> Result<()> {
        let alert = self.composer.compose(tier, owner, digest);
        tracing::info!(
            event = "alert_composed",
            tier = %alert.tier,
            sender = %alert.sender,
            recipient = %alert.recipient,
            cc = %alert.cc.join(","),
            subject = %alert.subject,
            body = %alert.body,
            "Notification composed (log transport)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::escalation::ClassifiedResource;
    use crate::models::{Provider, Resource, ResourceState, Thresholds};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Mutex;

    /// Mock notifier recording calls and failing for configured owners
    struct MockNotifier {
        failing: Vec<String>,
        calls: Mutex<Vec<(EscalationTier, String)>>,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn notify(
            &self,
            tier: EscalationTier,
            owner: &str,
            _digest: &OwnerDigest,
        ) -> Result<()> {
            self.calls.lock().unwrap().push((tier, owner.to_string()));
            if self.failing.iter().any(|f| f == owner) {
                anyhow::bail!("smtp 550 for {}", owner);
            }
            Ok(())
        }
    }

    fn digests() -> BTreeMap<String, OwnerDigest> {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let thresholds = Thresholds::from_hours(12.0, 24.0).unwrap();
        let spec = [
            ("i-1", "us-east-1", "alice", 30),
            ("i-2", "eu-west-1", "alice", 13),
            ("i-3", "us-east-1", "bob", 2),
            ("i-4", "us-east-1", "carol", 15),
        ];
        let classified: Vec<_> = spec
            .iter()
            .map(|(id, region, owner, hours)| {
                let resource = Resource::builder(Provider::Aws, *id, *region)
                    .state(ResourceState::Running)
                    .launch_time(Some(now - Duration::hours(*hours)))
                    .owner(Some(owner.to_string()))
                    .build();
                ClassifiedResource::new(resource, now, &thresholds)
            })
            .collect();
        aggregate(&classified)
    }

    #[tokio::test]
    async fn test_one_notification_per_owner_at_max_tier() {
        let notifier = Arc::new(MockNotifier {
            failing: vec![],
            calls: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(notifier.clone(), StructuredLogger::new("test"));

        let outcomes = dispatcher.dispatch(&digests()).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.values().all(|ok| *ok));

        let mut calls = notifier.calls.lock().unwrap().clone();
        calls.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            calls,
            vec![
                (EscalationTier::Critical, "alice".to_string()),
                (EscalationTier::Info, "bob".to_string()),
                (EscalationTier::Warning, "carol".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_owner() {
        let notifier = Arc::new(MockNotifier {
            failing: vec!["bob".to_string()],
            calls: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(notifier.clone(), StructuredLogger::new("test"));

        let outcomes = dispatcher.dispatch(&digests()).await;
        assert!(outcomes["alice"]);
        assert!(!outcomes["bob"]);
        assert!(outcomes["carol"]);
        assert_eq!(notifier.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let composer =
            AlertComposer::new(AlertSettings::new(Thresholds::from_hours(12.0, 24.0).unwrap()));
        let dispatcher = Dispatcher::new(
            Arc::new(LogNotifier::new(composer)),
            StructuredLogger::new("test"),
        );
        let outcomes = dispatcher.dispatch(&digests()).await;
        assert!(outcomes.values().all(|ok| *ok));
    }
}
