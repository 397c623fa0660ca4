// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of state-store write handlers.
//!
//! - [`SubscriptionId`] - Unique identifier for unregistering
//! - [`SubscriptionRegistry`] - Table of handlers keyed by state-store key

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::store::StateWrite;

/// Unique identifier for a registered handler.
///
/// Returned by [`SubscriptionRegistry::register`] and used to unregister
/// later. IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Handler invoked with each write to a subscribed key.
pub type StoreHandler = Arc<dyn Fn(&StateWrite) + Send + Sync>;

/// Process-wide table of handlers interested in writes to state-store keys.
///
/// The registry is an explicit object shared through `Arc` by every adapter;
/// [`register`](Self::register) and [`unregister`](Self::unregister) are its
/// only mutators.
///
/// A key ending in `*` is a pattern: it receives writes to every key that
/// starts with the part before the `*`.
///
/// # Thread Safety
///
/// Handlers are stored behind a `parking_lot::RwLock`. Dispatch clones the
/// matching handlers and releases the lock before calling them, so a handler
/// may unregister itself (or others) mid-dispatch. Each handler is called at
/// most once per dispatch.
///
/// # Examples
///
/// ```
/// use matter_state_sync::store::StateWrite;
/// use matter_state_sync::subscription::SubscriptionRegistry;
///
/// let registry = SubscriptionRegistry::new();
/// let id = registry.register("matter.0.4660.onOff.state", |write| {
///     println!("{} = {}", write.key, write.value);
/// });
///
/// assert_eq!(registry.dispatch(&StateWrite::pending("matter.0.4660.onOff.state", true)), 1);
/// assert!(registry.unregister(id));
/// ```
pub struct SubscriptionRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Handlers keyed by state-store key.
    handlers: RwLock<HashMap<String, HashMap<SubscriptionId, StoreHandler>>>,
}

impl SubscriptionRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a handler for writes to `key`, or to every key matching
    /// `key` if it ends in `*`.
    pub fn register<F>(&self, key: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&StateWrite) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.handlers
            .write()
            .entry(key.into())
            .or_default()
            .insert(id, Arc::new(handler));
        id
    }

    /// Unregisters a handler.
    ///
    /// Returns `true` if a handler was found and removed. Unregistering an
    /// unknown or already removed ID is a no-op returning `false`.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();

        let Some(key) = handlers
            .iter()
            .find_map(|(key, set)| set.contains_key(&id).then(|| key.clone()))
        else {
            return false;
        };

        if let Some(set) = handlers.get_mut(&key) {
            set.remove(&id);
            if set.is_empty() {
                handlers.remove(&key);
            }
        }
        true
    }

    /// Dispatches a write to every handler registered for its key or for a
    /// pattern matching it.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, write: &StateWrite) -> usize {
        let targets: Vec<StoreHandler> = {
            let handlers = self.handlers.read();
            handlers
                .iter()
                .filter(|(key, _)| matches(key, &write.key))
                .flat_map(|(_, set)| set.values().cloned())
                .collect()
        };

        for handler in &targets {
            handler(write);
        }
        targets.len()
    }

    /// Returns the number of handlers registered for `key`.
    #[must_use]
    pub fn handler_count(&self, key: &str) -> usize {
        self.handlers.read().get(key).map_or(0, HashMap::len)
    }

    /// Returns the total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(HashMap::len).sum()
    }

    /// Returns `true` if there are no registered handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Returns every key with at least one handler.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

fn matches(registered: &str, key: &str) -> bool {
    match registered.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => registered == key,
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("handler_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    const KEY: &str = "matter.0.n1.onOff.state";

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn dispatch_reaches_only_matching_key() {
        let registry = SubscriptionRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        registry.register(KEY, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 1);
        assert_eq!(registry.dispatch(&StateWrite::pending("other", true)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn trailing_star_matches_key_prefix() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        registry.register("matter.0.n1.*", move |write| {
            seen_clone.lock().push(write.key.clone());
        });
        registry.register(KEY, |_| {});

        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 2);
        assert_eq!(registry.dispatch(&StateWrite::pending("matter.0.n1.1.levelControl.level", 5.0)), 1);
        assert_eq!(registry.dispatch(&StateWrite::pending("matter.0.n10.onOff.state", true)), 0);
        assert_eq!(registry.dispatch(&StateWrite::pending("matter.0.n1", true)), 0);
        assert_eq!(
            *seen.lock(),
            vec![KEY.to_string(), "matter.0.n1.1.levelControl.level".to_string()]
        );
    }

    #[test]
    fn star_inside_key_is_literal() {
        let registry = SubscriptionRegistry::new();
        registry.register("matter.0.*.onOff.state", |_| {});

        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 0);
        assert_eq!(registry.dispatch(&StateWrite::pending("matter.0.*.onOff.state", true)), 1);
    }

    #[test]
    fn unregister_removes_handler_and_empty_key() {
        let registry = SubscriptionRegistry::new();
        let id = registry.register(KEY, |_| {});

        assert_eq!(registry.handler_count(KEY), 1);
        assert!(registry.unregister(id));
        assert_eq!(registry.handler_count(KEY), 0);
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn unregister_twice_is_harmless() {
        let registry = SubscriptionRegistry::new();
        let id = registry.register(KEY, |_| {});

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
    }

    #[test]
    fn multiple_handlers_same_key() {
        let registry = SubscriptionRegistry::new();
        let counter1 = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::new(AtomicU32::new(0));
        let c1 = counter1.clone();
        let c2 = counter2.clone();

        let id1 = registry.register(KEY, move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(KEY, move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&StateWrite::pending(KEY, true));
        registry.unregister(id1);
        registry.dispatch(&StateWrite::pending(KEY, false));

        assert_eq!(counter1.load(Ordering::SeqCst), 1);
        assert_eq!(counter2.load(Ordering::SeqCst), 2);
        assert_eq!(registry.handler_count(KEY), 1);
    }

    #[test]
    fn handler_may_unregister_itself_during_dispatch() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let counter = Arc::new(AtomicU32::new(0));
        let own_id = Arc::new(parking_lot::Mutex::new(None::<SubscriptionId>));

        let registry_clone = Arc::clone(&registry);
        let counter_clone = counter.clone();
        let own_id_clone = own_id.clone();
        let id = registry.register(KEY, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *own_id_clone.lock() {
                registry_clone.unregister(id);
            }
        });
        *own_id.lock() = Some(id);

        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 1);
        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn handler_unregistering_sibling_does_not_double_invoke() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let counter = Arc::new(AtomicU32::new(0));
        let sibling = Arc::new(parking_lot::Mutex::new(None::<SubscriptionId>));

        for _ in 0..2 {
            let registry_clone = Arc::clone(&registry);
            let counter_clone = counter.clone();
            let sibling_clone = sibling.clone();
            let id = registry.register(KEY, move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = sibling_clone.lock().take() {
                    registry_clone.unregister(id);
                }
            });
            *sibling.lock() = Some(id);
        }

        // Both handlers were snapshotted, so each runs exactly once
        assert_eq!(registry.dispatch(&StateWrite::pending(KEY, true)), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_unique_ids() {
        let registry = SubscriptionRegistry::new();
        let id1 = registry.register(KEY, |_| {});
        let id2 = registry.register(KEY, |_| {});
        let id3 = registry.register("other", |_| {});

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn registry_debug() {
        let registry = SubscriptionRegistry::new();
        registry.register(KEY, |_| {});

        let debug = format!("{registry:?}");
        assert!(debug.contains("SubscriptionRegistry"));
        assert!(debug.contains("handler_count"));
    }
}
