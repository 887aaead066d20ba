//! Backend selection for decision storage.
//!
//! Deployments register named store constructors and a selection policy that
//! maps a caller identifier to a backend name. Selection never fails: an
//! unknown name or a constructor error falls back to a shared in-process
//! [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::StoreResult;
use crate::store::{DecisionStore, MemoryStore};

/// Builds one store instance for a named backend.
pub type StoreConstructor =
    Arc<dyn Fn() -> StoreResult<Arc<dyn DecisionStore>> + Send + Sync>;

/// Maps a caller identifier to the name of the backend it should use.
pub type SelectionPolicy = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Registry of named store backends plus the policy choosing between them.
pub struct StoreFactory {
    backends: HashMap<String, StoreConstructor>,
    policy: SelectionPolicy,
    fallback: Arc<MemoryStore>,
}

impl StoreFactory {
    /// Creates a factory with the given selection policy and no registered
    /// backends. Until backends are registered every caller receives the
    /// fallback memory store.
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            backends: HashMap::new(),
            policy,
            fallback: Arc::new(MemoryStore::new()),
        }
    }

    /// Creates a factory that routes every caller to the same backend name.
    #[must_use]
    pub fn fixed(backend: impl Into<String>) -> Self {
        let backend = backend.into();
        Self::new(Arc::new(move |_| backend.clone()))
    }

    /// Registers a constructor under a backend name, replacing any previous
    /// registration of the same name.
    pub fn register(&mut self, name: impl Into<String>, constructor: StoreConstructor) {
        self.backends.insert(name.into(), constructor);
    }

    /// Registers the in-process memory backend under `name`.
    pub fn register_memory(&mut self, name: impl Into<String>) {
        self.register(
            name,
            Arc::new(|| Ok(Arc::new(MemoryStore::new()) as Arc<dyn DecisionStore>)),
        );
    }

    /// Resolves the store for one caller.
    ///
    /// The policy picks a backend name and its constructor runs. Both an
    /// unregistered name and a constructor failure degrade to the shared
    /// fallback memory store, so callers always get a working store.
    #[must_use]
    pub fn store_for(&self, caller_id: &str) -> Arc<dyn DecisionStore> {
        let name = (self.policy)(caller_id);
        let Some(constructor) = self.backends.get(&name) else {
            warn!(%caller_id, backend = %name, "unknown store backend, using memory fallback");
            return self.fallback_store();
        };
        match constructor() {
            Ok(store) => store,
            Err(err) => {
                warn!(%caller_id, backend = %name, ?err, "store construction failed, using memory fallback");
                self.fallback_store()
            }
        }
    }

    fn fallback_store(&self) -> Arc<dyn DecisionStore> {
        Arc::clone(&self.fallback) as Arc<dyn DecisionStore>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::time::Duration;

    #[tokio::test]
    async fn registered_backend_is_selected_by_policy() {
        let mut factory = StoreFactory::new(Arc::new(|caller: &str| {
            if caller.starts_with("agent-") {
                "agents".to_owned()
            } else {
                "gateway".to_owned()
            }
        }));
        factory.register_memory("agents");
        factory.register_memory("gateway");

        let store = factory.store_for("agent-billing");
        store
            .set_ex("k", "v".into(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_backend_falls_back_to_shared_memory_store() {
        let factory = StoreFactory::fixed("redis");

        let first = factory.store_for("a");
        first
            .set_ex("shared", "1".into(), Duration::from_secs(10))
            .await
            .unwrap();

        // The fallback is a single shared instance.
        let second = factory.store_for("b");
        assert!(second.get("shared").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn constructor_failure_falls_back() {
        let mut factory = StoreFactory::fixed("flaky");
        factory.register(
            "flaky",
            Arc::new(|| Err(StoreError::configuration("connection string missing"))),
        );

        let store = factory.store_for("anyone");
        assert!(store.ping().await);
    }
}
