//! Observable - synchronous, ordered fan-out to registered subscribers
//!
//! # Design
//!
//! - Subscribers are kept in registration order; removal compacts the sequence
//! - `notify` copies a snapshot under a read lock and releases the lock before
//!   invoking anything, so subscribers may re-enter the observable
//! - A panicking subscriber unwinds through `notify` (fail-fast);
//!   `notify_isolated` catches each panic and keeps going

use super::config::{DuplicatePolicy, ObservableConfig};
use super::subscription::{Entry, Subscriber, SubscriptionId};
use crate::error::{NotifyError, SubscriberFailure};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

/// Point-in-time counters for an observable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObservableStats {
    /// Subscribers currently registered
    pub subscribers: usize,
    /// Calls to `notify` / `notify_isolated`
    pub notifications: u64,
    /// Subscriber invocations that returned normally
    pub deliveries: u64,
    /// Subscriber invocations that panicked under `notify_isolated`
    pub failures: u64,
}

struct Registry<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

#[derive(Default)]
struct Counters {
    notifications: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
}

/// Ordered collection of subscribers that all receive every notified payload
///
/// # Example
///
/// ```rust
/// use observable::Observable;
/// use std::sync::{Arc, Mutex};
///
/// let observable = Observable::new();
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&log);
/// observable.subscribe(move |v: &i32| sink.lock().unwrap().push(format!("A:{v}")));
/// let sink = Arc::clone(&log);
/// observable.subscribe(move |v: &i32| sink.lock().unwrap().push(format!("B:{v}")));
///
/// observable.notify(&1);
/// assert_eq!(*log.lock().unwrap(), vec!["A:1", "B:1"]);
/// ```
pub struct Observable<T> {
    config: ObservableConfig,
    registry: RwLock<Registry<T>>,
    counters: Counters,
}

impl<T> Observable<T> {
    /// Create an empty observable with default configuration
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry {
                entries: Vec::new(),
                next_id: 0,
            }),
            counters: Counters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ObservableConfig {
        &self.config
    }

    /// Register a closure and return its token
    ///
    /// Every call wraps the closure in a fresh allocation, so the duplicate
    /// policy never applies here; use [`subscribe_shared`](Self::subscribe_shared)
    /// to register the same handle more than once.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(callback))
    }

    /// Register a shared handle and return its token
    ///
    /// Under [`DuplicatePolicy::Reject`] a handle that is already registered is
    /// not appended again; the token of the existing entry is returned.
    pub fn subscribe_shared(&self, callback: Subscriber<T>) -> SubscriptionId {
        let mut registry = self.write();

        if self.config.duplicates == DuplicatePolicy::Reject {
            if let Some(existing) = registry.entries.iter().find(|e| e.is_callback(&callback)) {
                debug!(
                    observable = %self.config.name,
                    subscription = %existing.id,
                    "Duplicate subscription rejected"
                );
                return existing.id;
            }
        }

        let id = SubscriptionId::new(registry.next_id);
        registry.next_id += 1;
        registry.entries.push(Entry { id, callback });

        debug!(
            observable = %self.config.name,
            subscription = %id,
            subscribers = registry.entries.len(),
            "Subscribed"
        );
        id
    }

    /// Remove the registration behind `id`
    ///
    /// Returns `false` and leaves the sequence untouched when the token is
    /// unknown or was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.write();
        let Some(index) = registry.entries.iter().position(|e| e.id == id) else {
            trace!(observable = %self.config.name, subscription = %id, "Unsubscribe of unknown token ignored");
            return false;
        };
        registry.entries.remove(index);

        debug!(
            observable = %self.config.name,
            subscription = %id,
            subscribers = registry.entries.len(),
            "Unsubscribed"
        );
        true
    }

    /// Remove every registration of this handle
    ///
    /// Matches by allocation identity and returns the number of entries
    /// removed; zero means nothing was registered.
    pub fn unsubscribe_callback(&self, callback: &Subscriber<T>) -> usize {
        let mut registry = self.write();
        let before = registry.entries.len();
        registry.entries.retain(|e| !e.is_callback(callback));
        let removed = before - registry.entries.len();

        if removed > 0 {
            debug!(
                observable = %self.config.name,
                removed = removed,
                subscribers = registry.entries.len(),
                "Unsubscribed callback"
            );
        }
        removed
    }

    /// Drop every registration, returning how many there were
    pub fn clear(&self) -> usize {
        let mut registry = self.write();
        let removed = registry.entries.len();
        registry.entries.clear();
        removed
    }

    /// Invoke every subscriber with `payload`, in registration order
    ///
    /// Runs on the calling thread and returns once all subscribers ran. A
    /// subscriber panic propagates to the caller and skips the remaining ones.
    pub fn notify(&self, payload: &T) {
        let snapshot = self.snapshot();
        self.counters.notifications.fetch_add(1, Ordering::Relaxed);
        trace!(observable = %self.config.name, subscribers = snapshot.len(), "Notify");

        for entry in &snapshot {
            (entry.callback)(payload);
            self.counters.deliveries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Like [`notify`](Self::notify), but a panicking subscriber does not stop
    /// the fan-out
    ///
    /// Returns the number of subscribers invoked, or every failure collected
    /// once all subscribers had their turn.
    pub fn notify_isolated(&self, payload: &T) -> Result<usize, NotifyError> {
        let snapshot = self.snapshot();
        self.counters.notifications.fetch_add(1, Ordering::Relaxed);
        trace!(observable = %self.config.name, subscribers = snapshot.len(), "Notify (isolated)");

        let mut failures = Vec::new();
        for entry in &snapshot {
            let callback = &entry.callback;
            match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => {
                    self.counters.deliveries.fetch_add(1, Ordering::Relaxed);
                }
                Err(cause) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    let message = panic_message(cause.as_ref());
                    warn!(
                        observable = %self.config.name,
                        subscription = %entry.id,
                        error = %message,
                        "Subscriber failed"
                    );
                    failures.push(SubscriberFailure {
                        id: entry.id,
                        message,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(snapshot.len())
        } else {
            Err(NotifyError::SubscribersFailed {
                attempted: snapshot.len(),
                failures,
            })
        }
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.read().entries.iter().any(|e| e.id == id)
    }

    /// Tokens in notification order
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.read().entries.iter().map(|e| e.id).collect()
    }

    pub fn stats(&self) -> ObservableStats {
        ObservableStats {
            subscribers: self.len(),
            notifications: self.counters.notifications.load(Ordering::Relaxed),
            deliveries: self.counters.deliveries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    fn snapshot(&self) -> Vec<Entry<T>> {
        self.read().entries.clone()
    }

    // Subscribers never run while a guard is held, so poisoning can only come
    // from a panic inside this module; the registry is still consistent then.
    fn read(&self) -> RwLockReadGuard<'_, Registry<T>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<T>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.config.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "subscriber panicked with a non-string payload".to_string()
    }
}
