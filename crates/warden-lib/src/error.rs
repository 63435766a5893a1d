//! Configuration errors raised before a pass starts

use thiserror::Error;

/// Errors that make the engine refuse to run
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} threshold is required")]
    MissingThreshold { name: &'static str },

    #[error("{name} threshold must not be negative (got {hours}h)")]
    NegativeThreshold { name: &'static str, hours: f64 },

    #[error("{name} threshold is not a finite number of hours")]
    NonFiniteThreshold { name: &'static str },

    #[error("{name} threshold of {hours}h is out of range")]
    ThresholdOutOfRange { name: &'static str, hours: f64 },

    #[error("critical threshold ({critical_secs}s) is below warning threshold ({warning_secs}s)")]
    InvertedThresholds {
        warning_secs: i64,
        critical_secs: i64,
    },

    #[error("invalid tag filter {0:?}: expected `key` or `key:value`")]
    InvalidTagFilter(String),
}
