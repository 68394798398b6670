//! Refresh notifications.
//!
//! Observers register a callback for one location or for every location and
//! are told when background revalidation replaced a cached URL. Callbacks run
//! on the refresh task, outside every resolver lock, and must not block.

use core_runtime::events::RefreshSource;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which refreshes a subscriber wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionScope {
    /// Every refreshed location
    All,
    /// Only refreshes of this exact original location string
    Location(String),
}

impl SubscriptionScope {
    pub fn location(location: impl Into<String>) -> Self {
        SubscriptionScope::Location(location.into())
    }

    fn matches(&self, original: &str) -> bool {
        match self {
            SubscriptionScope::All => true,
            SubscriptionScope::Location(location) => location == original,
        }
    }
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshNotification {
    /// Location string the entry is keyed by
    pub original: String,
    /// URL that replaced the cached value
    pub refreshed: String,
    /// How the fresher URL was found
    pub source: RefreshSource,
}

pub type RefreshCallback = Arc<dyn Fn(&RefreshNotification) + Send + Sync>;

struct Subscription {
    scope: SubscriptionScope,
    callback: RefreshCallback,
}

/// Registry of refresh callbacks.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<HashMap<SubscriptionId, Subscription>>,
}

impl Subscribers {
    pub fn subscribe(&self, scope: SubscriptionScope, callback: RefreshCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.entries.lock().insert(id, Subscription { scope, callback });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Invoke every matching callback. Returns how many were called.
    pub fn notify(&self, notification: &RefreshNotification) -> usize {
        let callbacks: Vec<RefreshCallback> = self
            .entries
            .lock()
            .values()
            .filter(|sub| sub.scope.matches(&notification.original))
            .map(|sub| Arc::clone(&sub.callback))
            .collect();

        for callback in &callbacks {
            callback(notification);
        }
        callbacks.len()
    }
}
