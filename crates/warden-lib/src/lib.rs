//! Uptime warden library
//!
//! This crate provides the core functionality for:
//! - Normalizing provider-native instance and cluster records
//! - Uptime measurement and escalation tier classification
//! - Per-owner digest aggregation and notification dispatch
//! - Batched remediation of resources past the critical threshold
//! - Health checks and observability

pub mod aggregate;
pub mod collector;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod health;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod remediation;
pub mod uptime;

pub use aggregate::{
    aggregate, remediation_groups, OwnerDigest, RemediationGroups, RemediationPolicy,
};
pub use collector::{
    collect_resources, CollectionOutcome, PassLoop, PassLoopBuilder, ResourceSource,
};
pub use dispatch::{AlertComposer, AlertSettings, Dispatcher, LogNotifier, Notifier};
pub use engine::{Engine, EngineConfig, Evaluation, PassReport, PassSummary};
pub use error::ConfigError;
pub use escalation::{classify, Classification, ClassifiedResource, EscalationTier};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use normalize::{ActorResolver, ResourceFilter, Snapshot, SnapshotSource, TagFilter};
pub use observability::{StructuredLogger, WardenMetrics};
pub use remediation::{
    DryRunRemediator, RemediationAction, RemediationDriver, RemediationKey, RemediationProvider,
};
