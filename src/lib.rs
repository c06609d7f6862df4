//! observable - typed publish/subscribe for Rust
//!
//! An [`Observable`] keeps an ordered list of subscribers and hands every
//! notified payload to each of them, synchronously and in registration order.
//!
//! - **Tokens, not closure equality**: `subscribe` returns a [`SubscriptionId`]
//!   that `unsubscribe` accepts; identity removal of a shared handle is still
//!   available through `unsubscribe_callback`
//! - **Snapshot fan-out**: subscribers may subscribe, unsubscribe or notify
//!   from inside a notification without skipping or repeating anyone
//! - **Fail-fast by default**: a panicking subscriber unwinds to the caller;
//!   `notify_isolated` collects failures instead
//!
//! # Quick Start
//!
//! ```rust
//! use observable::Observable;
//! use std::sync::{Arc, Mutex};
//!
//! let prices = Observable::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let id = prices.subscribe(move |price: &u32| sink.lock().unwrap().push(*price));
//!
//! prices.notify(&100);
//! prices.unsubscribe(id);
//! prices.notify(&200);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![100]);
//! ```
//!
//! Async consumers can follow an observable through an [`EventBus`]; the
//! [`LoggingObserver`] and [`MetricsObserver`] cover the common cases.

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used items at crate root
pub use crate::core::{
    subscriber, DuplicatePolicy, Observable, ObservableConfig, ObservableStats, Subscriber,
    SubscriptionId,
};
pub use error::{ConfigError, NotifyError, SubscriberFailure};
pub use events::observers::{LoggingObserver, Metrics, MetricsObserver};
pub use events::{EventBus, Notification};
