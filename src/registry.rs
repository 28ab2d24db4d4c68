//! Factory registry and singleton instance cache
//!
//! Both maps are `DashMap` with `ahash`, so individual operations are
//! thread-safe without a surrounding lock. The check-cache / produce /
//! populate-cache sequence in the container is not atomic across threads;
//! see the concurrency note on [`Container`](crate::Container).

use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;

use crate::factory::Factory;
use crate::value::Value;

#[cfg(feature = "logging")]
use tracing::trace;

/// Name-keyed store of factories plus the resolved singleton cache.
pub struct Registry {
    factories: DashMap<String, Factory, RandomState>,
    instances: DashMap<String, Value, RandomState>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: DashMap::with_hasher(RandomState::new()),
            instances: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Store a factory, replacing any prior binding for its identifier.
    ///
    /// The stale cached instance, if any, is evicted first so the new
    /// binding can never be shadowed by the old singleton.
    pub fn insert_factory(&self, factory: Factory) {
        self.evict(factory.id());
        self.factories.insert(factory.id().to_string(), factory);
    }

    /// Remove the factory for an identifier. The instance cache is left
    /// untouched.
    pub fn remove_factory(&self, id: &str) -> bool {
        self.factories.remove(id).is_some()
    }

    /// Snapshot the factory for an identifier.
    ///
    /// Returns a clone rather than a map guard: producing an instance
    /// recurses back into this registry, and holding a guard across that
    /// recursion could deadlock a shard.
    pub fn factory(&self, id: &str) -> Option<Factory> {
        self.factories.get(id).map(|entry| entry.value().clone())
    }

    /// Mutate the stored factory in place, if present.
    pub fn update_factory(&self, id: &str, update: impl FnOnce(&mut Factory)) -> bool {
        match self.factories.get_mut(id) {
            Some(mut entry) => {
                update(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Check whether a factory is registered.
    #[inline]
    pub fn has_factory(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Check whether the identifier has a cached instance or a factory.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id) || self.factories.contains_key(id)
    }

    /// Get the cached instance for an identifier.
    #[inline]
    pub fn cached(&self, id: &str) -> Option<Value> {
        self.instances.get(id).map(|entry| entry.value().clone())
    }

    /// Cache a resolved instance.
    pub fn cache_instance(&self, id: &str, value: Value) {
        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            id = id,
            "Caching resolved instance"
        );

        self.instances.insert(id.to_string(), value);
    }

    /// Drop the cached instance for an identifier.
    pub fn evict(&self, id: &str) -> bool {
        let evicted = self.instances.remove(id).is_some();

        #[cfg(feature = "logging")]
        if evicted {
            trace!(
                target: "keyed_injector",
                id = id,
                "Evicted stale cached instance"
            );
        }

        evicted
    }

    /// Number of registered factories.
    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if no factories are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// All registered identifiers (factories and direct instances).
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        for entry in self.instances.iter() {
            if !self.factories.contains_key(entry.key()) {
                ids.push(entry.key().clone());
            }
        }
        ids
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.factories.len())
            .field("cached", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Producer;

    fn factory(id: &str, singleton: bool) -> Factory {
        Factory::new(id, Producer::Instance(Value::new(id.to_string())), singleton)
    }

    #[test]
    fn insert_and_lookup() {
        let registry = Registry::new();
        assert!(!registry.contains("db"));

        registry.insert_factory(factory("db", true));
        assert!(registry.contains("db"));
        assert!(registry.has_factory("db"));
        assert_eq!(registry.factory("db").unwrap().id(), "db");
    }

    #[test]
    fn rebind_evicts_cached_instance() {
        let registry = Registry::new();
        registry.insert_factory(factory("db", true));
        registry.cache_instance("db", Value::new(1u8));
        assert!(registry.cached("db").is_some());

        registry.insert_factory(factory("db", false));
        assert!(registry.cached("db").is_none());
    }

    #[test]
    fn update_factory_in_place() {
        let registry = Registry::new();
        registry.insert_factory(factory("db", false));

        assert!(registry.update_factory("db", |f| f.set_singleton(true)));
        assert!(registry.factory("db").unwrap().is_singleton());
        assert!(!registry.update_factory("missing", |_| {}));
    }

    #[test]
    fn identifiers_cover_direct_instances() {
        let registry = Registry::new();
        registry.insert_factory(factory("db", true));
        registry.cache_instance("config", Value::new(2u8));

        let mut ids = registry.identifiers();
        ids.sort();
        assert_eq!(ids, ["config", "db"]);
    }
}
