//! Ready-made observers
//!
//! - `logging`: Structured logging via tracing
//! - `metrics`: Prometheus-compatible counters fed from an EventBus

pub mod logging;
pub mod metrics;

pub use logging::LoggingObserver;
pub use metrics::{Metrics, MetricsObserver};
