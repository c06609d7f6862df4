//! Subscription handles
//!
//! A subscriber is a shared callback; a [`SubscriptionId`] is the token handed
//! back by `subscribe` so a registration can be removed without comparing
//! closures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every notified payload
pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

/// Wrap a closure into a [`Subscriber`]
///
/// Keep the returned handle around if the registration should later be
/// removed by identity with `unsubscribe_callback`.
pub fn subscriber<T, F>(callback: F) -> Subscriber<T>
where
    F: Fn(&T) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Opaque token identifying one registration on an observable
///
/// Tokens are allocated from a per-observable counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value of the token
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A registered subscriber together with its token
pub(crate) struct Entry<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) callback: Subscriber<T>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> Entry<T> {
    /// Identity comparison on the callback allocation
    pub(crate) fn is_callback(&self, other: &Subscriber<T>) -> bool {
        Arc::ptr_eq(&self.callback, other)
    }
}
