//! Error types
//!
//! The core contract has no failure surface of its own. These types cover the
//! isolated notification extension and configuration loading.

use crate::core::SubscriptionId;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A subscriber that panicked during an isolated notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberFailure {
    /// Registration that failed
    pub id: SubscriptionId,
    /// Panic message, or a placeholder when the payload was not a string
    pub message: String,
}

/// Failure reported by `Observable::notify_isolated`
#[derive(Debug, Error)]
pub enum NotifyError {
    /// One or more subscribers panicked; the rest were still invoked
    #[error("{} of {attempted} subscribers failed during notification", .failures.len())]
    SubscribersFailed {
        /// Number of subscribers in the notification snapshot
        attempted: usize,
        /// Every failure, in notification order
        failures: Vec<SubscriberFailure>,
    },
}

impl NotifyError {
    /// Failures carried by this error
    pub fn failures(&self) -> &[SubscriberFailure] {
        match self {
            Self::SubscribersFailed { failures, .. } => failures,
        }
    }
}

/// Failure while loading an `ObservableConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bus_capacity must be greater than zero")]
    InvalidBusCapacity,
}
