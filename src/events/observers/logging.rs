//! Logging Observer
//!
//! Logs every notification through `tracing`, either synchronously as a
//! subscriber of an [`Observable`] or asynchronously from an [`EventBus`]
//! receiver.

use crate::core::{Observable, SubscriptionId};
use crate::events::{EventBus, Notification};
use std::fmt::Debug;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn, Level};

/// Observer that logs payloads with their `Debug` representation
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    name: String,
    level: Level,
}

impl LoggingObserver {
    /// Log at DEBUG, tagging each line with `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::DEBUG,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Register as a subscriber of `observable`
    pub fn attach<T>(self, observable: &Observable<T>) -> SubscriptionId
    where
        T: Debug + 'static,
    {
        observable.subscribe(move |payload: &T| self.log_event(payload))
    }

    /// Log a single payload at the configured level
    pub fn log_event<T: Debug>(&self, payload: &T) {
        let name = self.name.as_str();
        match self.level {
            Level::ERROR => error!(observer = %name, payload = ?payload, "Notification"),
            Level::WARN => warn!(observer = %name, payload = ?payload, "Notification"),
            Level::INFO => info!(observer = %name, payload = ?payload, "Notification"),
            Level::DEBUG => debug!(observer = %name, payload = ?payload, "Notification"),
            _ => trace!(observer = %name, payload = ?payload, "Notification"),
        }
    }

    /// Log notifications from `bus` until the channel closes
    ///
    /// This should be spawned as a tokio task:
    /// ```rust,ignore
    /// tokio::spawn(observer.run(&bus));
    /// ```
    pub fn run<T>(self, bus: &EventBus<T>) -> impl std::future::Future<Output = ()> + Send + 'static
    where
        T: Debug + Clone + Send + 'static,
    {
        let receiver = bus.subscribe();
        self.drain(receiver)
    }

    async fn drain<T>(self, mut receiver: broadcast::Receiver<Notification<T>>)
    where
        T: Debug + Clone + Send + 'static,
    {
        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    trace!(observer = %self.name, sequence = notification.sequence, "Received");
                    self.log_event(&notification.payload);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(observer = %self.name, "EventBus closed, logging observer stopping");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        observer = %self.name,
                        skipped = count,
                        "Logging observer lagged, skipped {} notifications", count
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ==========================================
    // Logging Tests
    // ==========================================

    #[test]
    fn test_log_at_every_level() {
        // Verifies the dispatch doesn't panic; output capture is not asserted
        for level in [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ] {
            LoggingObserver::new("test")
                .with_level(level)
                .log_event(&("order", 7));
        }
    }

    #[test]
    fn test_default_level_is_debug() {
        assert_eq!(LoggingObserver::new("x").level(), Level::DEBUG);
    }

    #[test]
    fn test_attach_registers_subscriber() {
        let observable = Observable::new();
        let id = LoggingObserver::new("orders").attach(&observable);

        assert!(observable.contains(id));
        observable.notify(&"created");
        assert_eq!(observable.stats().deliveries, 1);
    }

    // ==========================================
    // Bus Integration Tests
    // ==========================================

    #[tokio::test]
    async fn test_run_stops_on_bus_drop() {
        let bus = EventBus::new(100);
        let observer = LoggingObserver::new("bus").run(&bus);

        bus.emit("first".to_string());
        bus.emit("second".to_string());

        // Drop the bus to close the channel
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), observer)
            .await
            .expect("Observer should stop when bus is dropped");
    }

    #[tokio::test]
    async fn test_run_survives_lag() {
        let bus = EventBus::new(1);
        let observer = LoggingObserver::new("lagging").run(&bus);

        for i in 0..10u32 {
            bus.emit(i);
        }
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), observer)
            .await
            .expect("Observer should drain and stop");
    }

    #[tokio::test]
    async fn test_run_processes_spawned() {
        let bus = EventBus::new(100);
        let handle = tokio::spawn(LoggingObserver::new("spawned").run(&bus));

        bus.emit(1u64);
        bus.emit(2u64);
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Timeout")
            .expect("Observer task should complete");
    }
}
