//! Core publish/subscribe primitives
//!
//! - [`Observable`]: ordered subscriber registry with synchronous fan-out
//! - [`SubscriptionId`]: token returned by `subscribe`, accepted by `unsubscribe`
//! - [`ObservableConfig`]: naming and duplicate-subscription policy

pub mod config;
pub mod observable;
pub mod subscription;

pub use config::{DuplicatePolicy, ObservableConfig, DEFAULT_BUS_CAPACITY};
pub use observable::{Observable, ObservableStats};
pub use subscription::{subscriber, Subscriber, SubscriptionId};
