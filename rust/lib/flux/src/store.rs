use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::pattern;
use crate::value::{StateValue, SubscriptionId};

/// Callback type for state change notifications.
pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

/// Per-path state store with pattern subscriptions.
///
/// - `set(path, value)` stores a snapshot and notifies matching subscribers.
/// - `get(path)` reads the current snapshot (Arc clone, cheap).
/// - `scan(prefix)` lists all children under a prefix path.
/// - `subscribe(pattern, handler)` / `unsubscribe(id)`.
///
/// Handlers run synchronously on the thread that called `set`, after the
/// value is visible to `get`. No internal lock is held while they run, so a
/// handler may read and write the store.
pub struct StateStore {
    values: RwLock<BTreeMap<String, StateValue>>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    pattern: String,
    handler: ChangeHandler,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Set a typed value at the given path and notify matching subscribers.
    pub fn set<T: Any + Send + Sync>(&self, path: &str, value: T) {
        self.set_value(path, StateValue::new(value));
    }

    /// Set a pre-built StateValue at the given path and notify matching subscribers.
    pub fn set_value(&self, path: &str, value: StateValue) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), value.clone());

        let matched: Vec<ChangeHandler> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| pattern::matches(&s.pattern, path))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        trace!(path, subscribers = matched.len(), "state set");
        for handler in matched {
            handler(path, &value);
        }
    }

    /// Get the current snapshot at the given path.
    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Get a clone of the typed value at `path`.
    ///
    /// Returns `None` when the path is unset or holds a different type.
    pub fn get_cloned<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|v| v.downcast_ref::<T>().cloned())
    }

    /// Remove the value at the given path. Does NOT notify subscribers.
    pub fn remove(&self, path: &str) -> Option<StateValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// All entries whose path starts with `{prefix}/`, ordered by path.
    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let scan_prefix = format!("{}/", prefix);
        values
            .range(scan_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&scan_prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to state changes matching the given pattern.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                pattern: pattern.to_string(),
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != id);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct FeedFlags {
        loading_more: bool,
    }

    // ========================================================================
    // Basic get/set
    // ========================================================================

    #[test]
    fn set_and_get_cloned() {
        let store = StateStore::new();
        store.set("feed/flags", FeedFlags { loading_more: true });

        assert_eq!(
            store.get_cloned::<FeedFlags>("feed/flags"),
            Some(FeedFlags { loading_more: true })
        );
        assert_eq!(store.get_cloned::<bool>("feed/flags"), None);
        assert!(store.get("feed/missing").is_none());
    }

    #[test]
    fn set_overwrites_previous_value() {
        let store = StateStore::new();
        store.set("card/p1/caption", false);
        store.set("card/p1/caption", true);
        assert_eq!(store.get_cloned::<bool>("card/p1/caption"), Some(true));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_does_not_notify() {
        let store = StateStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        store.subscribe("card/#", move |_, _| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        store.set("card/p1/caption", true);
        assert!(store.remove("card/p1/caption").is_some());
        assert!(!store.contains("card/p1/caption"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    // ========================================================================
    // Scan
    // ========================================================================

    #[test]
    fn scan_returns_children_only() {
        let store = StateStore::new();
        store.set("card", 0u32);
        store.set("card/p1/caption", true);
        store.set("card/p2/caption", false);
        store.set("cards", 9u32);

        let keys: Vec<String> = store.scan("card").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["card/p1/caption", "card/p2/caption"]);
    }

    // ========================================================================
    // Subscribe / unsubscribe
    // ========================================================================

    #[test]
    fn subscriber_sees_matching_paths_only() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let s = seen.clone();
        store.subscribe("favorites/+", move |path, _| {
            s.lock().unwrap().push(path.to_string());
        });

        store.set("favorites/set", 1u32);
        store.set("feed/state", 2u32);
        store.set("favorites/view", 3u32);

        assert_eq!(*seen.lock().unwrap(), vec!["favorites/set", "favorites/view"]);
    }

    #[test]
    fn handler_can_write_back_to_store() {
        let store = Arc::new(StateStore::new());
        let weak = Arc::downgrade(&store);
        store.subscribe("feed/state", move |_, value| {
            let Some(store) = weak.upgrade() else { return };
            let n = value.downcast_ref::<u32>().copied().unwrap_or(0);
            store.set("feed/view", n * 10);
        });

        store.set("feed/state", 4u32);
        assert_eq!(store.get_cloned::<u32>("feed/view"), Some(40));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = StateStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let id = store.subscribe("#", move |_, _| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        store.set("feed/state", 1u32);
        store.unsubscribe(id);
        store.set("feed/state", 2u32);
        store.unsubscribe(id);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn subscription_ids_are_unique() {
        let store = StateStore::new();
        let a = store.subscribe("a", |_, _| {});
        let b = store.subscribe("a", |_, _| {});
        assert_ne!(a, b);
    }

    fn _assert_store_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StateStore>();
    }
}
