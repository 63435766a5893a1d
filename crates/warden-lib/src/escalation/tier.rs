//! Escalation tier

use std::fmt;

use serde::{Deserialize, Serialize};

/// Escalation severity for a resource or owner within one pass
///
/// Variants are declared in ascending order so the derived `Ord` gives
/// `None < Info < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EscalationTier {
    #[default]
    None,
    Info,
    Warning,
    Critical,
}

impl EscalationTier {
    pub const ALL: [EscalationTier; 4] = [
        EscalationTier::None,
        EscalationTier::Info,
        EscalationTier::Warning,
        EscalationTier::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTier::None => "none",
            EscalationTier::Info => "info",
            EscalationTier::Warning => "warning",
            EscalationTier::Critical => "critical",
        }
    }

    /// Whether this tier puts a resource into an owner digest
    pub fn is_notifiable(&self) -> bool {
        *self > EscalationTier::None
    }

    /// Whether department heads are copied on the notification
    pub fn copies_heads(&self) -> bool {
        *self >= EscalationTier::Warning
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
