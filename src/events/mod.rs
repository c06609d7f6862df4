//! Async delivery of observable notifications
//!
//! An [`EventBus`] can be attached to an [`Observable`](crate::Observable) so
//! every synchronous notification is also re-published on a broadcast channel.
//! Observers on the async side receive [`Notification`] envelopes:
//!
//! ```text
//! producer → Observable::notify → [sync subscribers..., EventBus] → [MetricsObserver, ...]
//! ```

pub mod bus;
pub mod observers;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A payload together with its position in the bus stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification<T> {
    /// Monotonically increasing per bus, starting at 0
    pub sequence: u64,
    /// When the notification was emitted
    #[serde(with = "system_time_serde")]
    pub timestamp: SystemTime,
    pub payload: T,
}

impl<T> Notification<T> {
    pub fn new(sequence: u64, payload: T) -> Self {
        Self {
            sequence,
            timestamp: SystemTime::now(),
            payload,
        }
    }
}

/// Serde module for SystemTime serialization
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

pub use bus::EventBus;
