//! Escalation tiers and resource classification
//!
//! This module provides:
//! - The totally ordered escalation tier (none < info < warning < critical)
//! - Per-resource classification against warning/critical thresholds

mod classifier;
mod tier;

pub use classifier::{classify, Classification, ClassifiedResource};
pub use tier::EscalationTier;
