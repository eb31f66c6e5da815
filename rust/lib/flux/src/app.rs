use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use crate::router::Router;
use crate::store::StateStore;
use crate::value::{StateValue, SubscriptionId};

/// The state bus shared by the feed engine and the presentation layer.
///
/// ```ignore
/// let flux = Flux::new();
///
/// flux.on("feed/refresh", |_, _, store| async move {
///     store.set("feed/view", view);
/// });
///
/// flux.subscribe("feed/view", |_, value| render(value));
/// flux.emit("feed/refresh", RefreshReq).await;
/// ```
pub struct Flux {
    store: Arc<StateStore>,
    router: Router,
}

impl Flux {
    pub fn new() -> Self {
        Self::with_store(Arc::new(StateStore::new()))
    }

    /// Build a bus over an existing store, so components constructed
    /// before the bus publish into the same namespace.
    pub fn with_store(store: Arc<StateStore>) -> Self {
        Self {
            store,
            router: Router::new(),
        }
    }

    // ====================================================================
    // State
    // ====================================================================

    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.store.get(path)
    }

    pub fn get_cloned<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.store.get_cloned(path)
    }

    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        self.store.scan(prefix)
    }

    // ====================================================================
    // Requests
    // ====================================================================

    /// Emit a request and wait for its handler(s) to complete.
    ///
    /// If no handler matches, this is a silent no-op.
    pub async fn emit<T: Any + Send + Sync>(&self, path: &str, payload: T) {
        self.router
            .dispatch(path, Arc::new(payload), Arc::clone(&self.store))
            .await;
    }

    /// Register an async request handler for a path pattern.
    pub fn on<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(String, Arc<dyn Any + Send + Sync>, Arc<StateStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.router.on(pattern, handler);
    }

    pub fn has_handler(&self, path: &str) -> bool {
        self.router.matches(path)
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        self.store.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

impl Default for Flux {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn emit_handler_publishes_and_subscriber_observes() {
        let flux = Flux::new();
        let renders = Arc::new(AtomicU64::new(0));
        let r = renders.clone();
        flux.subscribe("feed/view", move |_, _| {
            r.fetch_add(1, Ordering::Relaxed);
        });

        flux.on("feed/refresh", |_, _, store: Arc<StateStore>| async move {
            let n = store.get_cloned::<u32>("feed/view").unwrap_or(0);
            store.set("feed/view", n + 1);
        });

        flux.emit("feed/refresh", ()).await;
        flux.emit("feed/refresh", ()).await;

        assert_eq!(flux.get_cloned::<u32>("feed/view"), Some(2));
        assert_eq!(renders.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn with_store_shares_namespace() {
        let store = Arc::new(StateStore::new());
        store.set("feed/state", 7u32);
        let flux = Flux::with_store(store.clone());
        assert_eq!(flux.get_cloned::<u32>("feed/state"), Some(7));
        assert!(Arc::ptr_eq(flux.store(), &store));
    }

    #[test]
    fn has_handler_uses_patterns() {
        let flux = Flux::new();
        flux.on("card/#", |_, _, _| async {});
        assert!(flux.has_handler("card/press"));
        assert!(!flux.has_handler("feed/start"));
    }

    fn _assert_flux_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Flux>();
    }
}
