//! Metrics Observer
//!
//! Tracks Prometheus-compatible counters for an observable:
//! - Notifications received from the bus, by caller-defined kind
//! - Notifications lost to receiver lag
//! - Subscriber, delivery and failure counts taken from `ObservableStats`

use crate::core::ObservableStats;
use crate::events::{EventBus, Notification};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Counters collected from notifications
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Notifications received, by kind
    pub notifications_by_kind: BTreeMap<String, u64>,
    /// Total notifications received
    pub received_total: u64,
    /// Notifications skipped because the receiver lagged
    pub lagged_total: u64,
    /// Highest sequence number seen
    pub last_sequence: Option<u64>,
    /// Latest snapshot of the observable's own counters
    pub observable: ObservableStats,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received notification
    pub fn record_notification(&mut self, kind: &str, sequence: u64) {
        *self
            .notifications_by_kind
            .entry(kind.to_string())
            .or_insert(0) += 1;
        self.received_total += 1;
        self.last_sequence = Some(self.last_sequence.map_or(sequence, |s| s.max(sequence)));
    }

    pub fn record_lag(&mut self, skipped: u64) {
        self.lagged_total += skipped;
    }

    /// Replace the observable counters with a fresh snapshot
    pub fn absorb_stats(&mut self, stats: &ObservableStats) {
        self.observable = stats.clone();
    }

    /// Fraction of subscriber invocations that panicked
    pub fn failure_ratio(&self) -> f64 {
        let attempts = self.observable.deliveries + self.observable.failures;
        if attempts == 0 {
            0.0
        } else {
            self.observable.failures as f64 / attempts as f64
        }
    }

    /// Format metrics as Prometheus text format
    pub fn to_prometheus(&self, observable: &str) -> String {
        let mut output = String::new();
        let stats = &self.observable;

        output.push_str("# HELP observable_subscribers Subscribers currently registered\n");
        output.push_str("# TYPE observable_subscribers gauge\n");
        let _ = writeln!(
            output,
            "observable_subscribers{{observable=\"{}\"}} {}",
            observable, stats.subscribers
        );

        output.push_str("# HELP observable_notifications_total Notifications published\n");
        output.push_str("# TYPE observable_notifications_total counter\n");
        let _ = writeln!(
            output,
            "observable_notifications_total{{observable=\"{}\"}} {}",
            observable, stats.notifications
        );

        output.push_str("# HELP observable_deliveries_total Subscriber invocations that completed\n");
        output.push_str("# TYPE observable_deliveries_total counter\n");
        let _ = writeln!(
            output,
            "observable_deliveries_total{{observable=\"{}\"}} {}",
            observable, stats.deliveries
        );

        output.push_str("# HELP observable_failures_total Subscriber invocations that panicked\n");
        output.push_str("# TYPE observable_failures_total counter\n");
        let _ = writeln!(
            output,
            "observable_failures_total{{observable=\"{}\"}} {}",
            observable, stats.failures
        );

        output.push_str("# HELP observable_bus_received_total Notifications received from the bus\n");
        output.push_str("# TYPE observable_bus_received_total counter\n");
        for (kind, count) in &self.notifications_by_kind {
            let _ = writeln!(
                output,
                "observable_bus_received_total{{observable=\"{}\",kind=\"{}\"}} {}",
                observable, kind, count
            );
        }

        output.push_str("# HELP observable_bus_lagged_total Notifications dropped by a lagging receiver\n");
        output.push_str("# TYPE observable_bus_lagged_total counter\n");
        let _ = writeln!(
            output,
            "observable_bus_lagged_total{{observable=\"{}\"}} {}",
            observable, self.lagged_total
        );

        output
    }

    /// Generate a human-readable report
    pub fn report(&self, observable: &str) -> String {
        let mut output = String::new();
        let stats = &self.observable;

        let _ = writeln!(output, "=== Metrics Report: {} ===\n", observable);
        let _ = writeln!(
            output,
            "Subscribers: {}  Notifications: {}  Deliveries: {}  Failures: {} ({:.1}%)",
            stats.subscribers,
            stats.notifications,
            stats.deliveries,
            stats.failures,
            self.failure_ratio() * 100.0
        );

        output.push_str("\nReceived by kind:\n");
        for (kind, count) in &self.notifications_by_kind {
            let _ = writeln!(output, "  {}: {}", kind, count);
        }

        let _ = writeln!(
            output,
            "\nBus: received={}, lagged={}, last_sequence={}",
            self.received_total,
            self.lagged_total,
            self.last_sequence
                .map_or_else(|| "-".to_string(), |s| s.to_string())
        );

        output
    }
}

type Classifier<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Observer that counts bus notifications by kind
pub struct MetricsObserver<T> {
    receiver: broadcast::Receiver<Notification<T>>,
    metrics: Arc<Mutex<Metrics>>,
    classify: Classifier<T>,
}

impl<T> MetricsObserver<T>
where
    T: Clone + Send + 'static,
{
    /// Create a metrics observer subscribed to the bus
    ///
    /// `classify` maps each payload to the `kind` label it is counted under.
    pub fn new<F>(bus: &EventBus<T>, classify: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            receiver: bus.subscribe(),
            metrics: Arc::new(Mutex::new(Metrics::new())),
            classify: Box::new(classify),
        }
    }

    /// Get a handle to the metrics for reading
    pub fn metrics(&self) -> Arc<Mutex<Metrics>> {
        Arc::clone(&self.metrics)
    }

    /// Run the observer, collecting metrics until the channel closes
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => self.process(&notification),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.lock().record_lag(skipped);
                }
            }
        }
    }

    /// Count a single notification
    pub fn process(&self, notification: &Notification<T>) {
        let kind = (self.classify)(&notification.payload);
        self.lock().record_notification(&kind, notification.sequence);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Metrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
