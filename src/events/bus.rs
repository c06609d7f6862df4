//! EventBus - async bridge for observable notifications
//!
//! Re-publishes payloads on a broadcast channel so async consumers can follow
//! an observable without running inside its synchronous fan-out.
//!
//! # Design
//!
//! - Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
//! - Non-blocking emit (fire-and-forget)
//! - Lagging receivers drop old notifications (no backpressure)
//! - Thread-safe via Clone (Arc internally)

use super::Notification;
use crate::core::{Observable, SubscriptionId, DEFAULT_BUS_CAPACITY};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Broadcast bridge carrying [`Notification`] envelopes
///
/// # Example
///
/// ```rust,ignore
/// use observable::{EventBus, Observable};
///
/// let observable = Observable::new();
/// let bus = EventBus::new(1024);
/// bus.attach(&observable);
/// let mut rx = bus.subscribe();
///
/// observable.notify(&"order-7".to_string());
///
/// let notification = rx.recv().await?;
/// assert_eq!(notification.payload, "order-7");
/// ```
pub struct EventBus<T> {
    sender: Arc<broadcast::Sender<Notification<T>>>,
    // Held across allocation and send so receivers see sequences in order
    sequence: Arc<Mutex<u64>>,
}

impl<T> EventBus<T>
where
    T: Clone + Send + 'static,
{
    /// Create a new EventBus with the specified capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of notifications to buffer before old
    ///   ones are dropped for lagging receivers; zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
            sequence: Arc::new(Mutex::new(0)),
        }
    }

    /// Create an EventBus with default capacity (1024)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }

    /// Emit a payload to all receivers and return its sequence number
    ///
    /// If there are no receivers the notification is silently dropped; the
    /// sequence number is consumed either way. Concurrent emitters are
    /// serialized, so every receiver sees sequence numbers in increasing order.
    pub fn emit(&self, payload: T) -> u64 {
        let mut next = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = *next;
        *next += 1;
        // Ignore send errors (no receivers)
        let _ = self.sender.send(Notification::new(sequence, payload));
        sequence
    }

    /// Subscribe to receive notifications
    ///
    /// Returns a receiver that will get everything emitted after
    /// subscription. If the receiver falls behind, old notifications are
    /// dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification<T>> {
        self.sender.subscribe()
    }

    /// Get the current number of active receivers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Forward every notification of `observable` onto this bus
    ///
    /// The forwarder is an ordinary subscriber: it runs at its position in the
    /// registration order and is removed with the returned token.
    pub fn attach(&self, observable: &Observable<T>) -> SubscriptionId {
        let bus = self.clone();
        observable.subscribe(move |payload: &T| {
            bus.emit(payload.clone());
        })
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            sequence: Arc::clone(&self.sequence),
        }
    }
}

impl<T> Default for EventBus<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .field(
                "emitted",
                &*self.sequence.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish()
    }
}
