//! The container facade
//!
//! Binds string identifiers to factories, resolves them on demand through
//! the active resolver strategy, and caches singleton instances.

use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, Result};
use crate::factory::{Factory, FactoryHandle, Producer};
use crate::metadata::{ResolvedArgs, TypeDescriptor, TypeRegistry};
use crate::parameter::ParameterCollection;
use crate::registry::Registry;
use crate::resolver::{resolve_slot, ConstructorResolver, Resolver};
use crate::value::Value;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Container construction options.
///
/// `resolver` is the default strategy used by every resolver-backed binding;
/// `factories` seeds the registry with pre-built bindings.
#[derive(Clone)]
pub struct Config {
    /// The default resolution strategy
    pub resolver: Arc<dyn Resolver>,
    /// Initial factories to register
    pub factories: Vec<Factory>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver: Arc::new(ConstructorResolver::new()),
            factories: Vec::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Target of a [`Container::call`]: either an identifier resolved through
/// the container, or an already-built instance paired with its type name.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// Resolve this identifier, then invoke on the result
    Id(String),
    /// Invoke on this instance, using the named type descriptor
    Instance {
        /// The receiver
        value: Value,
        /// The descriptor the method is declared on
        type_name: String,
    },
}

impl CallTarget {
    /// Target an existing instance.
    pub fn instance(value: Value, type_name: impl Into<String>) -> Self {
        Self::Instance {
            value,
            type_name: type_name.into(),
        }
    }
}

impl From<&str> for CallTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for CallTarget {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// String-keyed dependency injection container.
///
/// Cloning is cheap and shares the underlying registries, so a clone is the
/// same container, not a copy.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{Container, ParameterCollection, Slot, TypeDescriptor};
///
/// struct Logger { level: String }
///
/// let container = Container::new();
/// container.register_type(
///     TypeDescriptor::builder::<Logger>("Logger")
///         .constructor([Slot::new("level").with_default(String::from("info"))], |args| {
///             Ok(Logger { level: args.value(0)? })
///         })
///         .build(),
/// );
///
/// container.singleton("Logger");
/// let logger = container.get("Logger").unwrap();
/// assert_eq!(logger.downcast_ref::<Logger>().unwrap().level, "info");
/// ```
///
/// # Concurrency
///
/// The registry maps are individually thread-safe, but the
/// check-cache / produce / populate-cache sequence in [`make`](Self::make)
/// is not one atomic step: two threads racing on an uncached singleton can
/// both run the producer, with the last write winning the cache slot. Guard
/// `make` externally if that matters. Resolution itself is synchronous, and
/// the cycle guard is per thread.
#[derive(Clone)]
pub struct Container {
    registry: Arc<Registry>,
    types: Arc<TypeRegistry>,
    resolver: Arc<dyn Resolver>,
}

impl Container {
    /// Create a container with the default constructor-injection strategy.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a container from explicit options.
    pub fn with_config(config: Config) -> Self {
        let registry = Registry::new();
        for factory in config.factories {
            registry.insert_factory(factory);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            bindings = registry.len(),
            "Creating container"
        );

        Self {
            registry: Arc::new(registry),
            types: Arc::new(TypeRegistry::new()),
            resolver: config.resolver,
        }
    }

    /// The active resolver strategy.
    #[inline]
    pub fn resolver(&self) -> &dyn Resolver {
        &*self.resolver
    }

    /// Register the metadata descriptor for a constructible type.
    pub fn register_type(&self, descriptor: TypeDescriptor) {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            type_name = descriptor.name(),
            slots = descriptor.constructor_slots().len(),
            "Registering type descriptor"
        );

        self.types.register(descriptor);
    }

    #[inline]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub(crate) fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// True if `id` could be produced: it is bound, cached, or has a
    /// registered type descriptor the auto-bind path can use.
    pub(crate) fn can_resolve(&self, id: &str) -> bool {
        self.registry.contains(id) || self.types.contains(id)
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Bind an identifier to itself: resolving it builds the type of the
    /// same name through the active resolver.
    ///
    /// Evicts any cached instance for `id`.
    pub fn bind<'c>(&'c self, id: &str) -> FactoryHandle<'c> {
        self.bind_producer(id, Producer::Type(id.to_string()), false)
    }

    /// Bind an identifier to a (usually different) type name.
    pub fn bind_type<'c>(&'c self, id: &str, type_name: impl Into<String>) -> FactoryHandle<'c> {
        self.bind_producer(id, Producer::Type(type_name.into()), false)
    }

    /// Bind an identifier to a producer closure.
    pub fn bind_factory<'c, F>(&'c self, id: &str, producer: F) -> FactoryHandle<'c>
    where
        F: Fn(&Container, &ParameterCollection) -> Result<Value> + Send + Sync + 'static,
    {
        self.bind_producer(id, Producer::Closure(Arc::new(producer)), false)
    }

    /// [`bind`](Self::bind) with the singleton flag set.
    pub fn singleton<'c>(&'c self, id: &str) -> FactoryHandle<'c> {
        self.bind_producer(id, Producer::Type(id.to_string()), true)
    }

    /// [`bind_type`](Self::bind_type) with the singleton flag set.
    pub fn singleton_type<'c>(
        &'c self,
        id: &str,
        type_name: impl Into<String>,
    ) -> FactoryHandle<'c> {
        self.bind_producer(id, Producer::Type(type_name.into()), true)
    }

    /// [`bind_factory`](Self::bind_factory) with the singleton flag set.
    pub fn singleton_factory<'c, F>(&'c self, id: &str, producer: F) -> FactoryHandle<'c>
    where
        F: Fn(&Container, &ParameterCollection) -> Result<Value> + Send + Sync + 'static,
    {
        self.bind_producer(id, Producer::Closure(Arc::new(producer)), true)
    }

    /// Bind an identifier directly to an already-built value.
    ///
    /// Bypasses the factory/resolver path entirely: the value goes straight
    /// into the instance cache and any existing factory for `id` is removed.
    pub fn instance(&self, id: &str, value: Value) {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            id = id,
            "Binding pre-built instance"
        );

        self.registry.remove_factory(id);
        self.registry.cache_instance(id, value);
    }

    fn bind_producer<'c>(
        &'c self,
        id: &str,
        producer: Producer,
        singleton: bool,
    ) -> FactoryHandle<'c> {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            id = id,
            singleton = singleton,
            "Binding identifier"
        );

        self.registry
            .insert_factory(Factory::new(id, producer, singleton));
        FactoryHandle::new(self, id.to_string())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Check whether the identifier has a cached instance or a registered
    /// factory.
    #[inline]
    pub fn has(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Resolve an identifier, auto-binding it if unknown.
    ///
    /// An unbound `id` is bound on the fly as itself and the supplied
    /// `parameters` are copied onto that fresh factory; for an existing
    /// binding the factory's own bound parameters are used and `parameters`
    /// is ignored. A cached singleton instance short-circuits the producer.
    pub fn make(&self, id: &str, parameters: ParameterCollection) -> Result<Value> {
        if !self.has(id) {
            #[cfg(feature = "logging")]
            debug!(
                target: "keyed_injector",
                id = id,
                parameters = parameters.len(),
                "Auto-binding unknown identifier"
            );

            let mut factory = Factory::new(id, Producer::Type(id.to_string()), false);
            for parameter in &parameters {
                factory.bind_parameter(parameter.clone());
            }
            self.registry.insert_factory(factory);
        }

        if let Some(cached) = self.registry.cached(id) {
            #[cfg(feature = "logging")]
            trace!(
                target: "keyed_injector",
                id = id,
                "Returning cached singleton instance"
            );
            return Ok(cached);
        }

        let factory = self
            .registry
            .factory(id)
            .ok_or_else(|| ContainerError::not_found(id))?;

        let value = factory.produce(self)?;

        if factory.is_singleton() {
            self.registry.cache_instance(id, value.clone());
        }

        Ok(value)
    }

    /// Resolve a bound identifier.
    ///
    /// The strict accessor: fails with [`ContainerError::NotFound`] when the
    /// identifier is unbound instead of auto-binding like
    /// [`make`](Self::make).
    pub fn get(&self, id: &str) -> Result<Value> {
        if !self.has(id) {
            return Err(ContainerError::not_found(id));
        }
        self.make(id, ParameterCollection::new())
    }

    /// Invoke a declared method on a target, auto-resolving its parameters.
    ///
    /// The target is either an identifier (resolved via [`make`](Self::make))
    /// or an existing instance paired with its type name. Each of the
    /// method's declared slots is resolved with the same precedence as
    /// constructor slots, with `parameters` acting as explicit overrides.
    pub fn call(
        &self,
        target: impl Into<CallTarget>,
        method: &str,
        parameters: ParameterCollection,
    ) -> Result<Value> {
        let (value, type_name) = match target.into() {
            CallTarget::Id(id) => {
                let value = self.make(&id, ParameterCollection::new())?;
                let type_name = self
                    .registry
                    .factory(&id)
                    .map(|factory| factory.produced_type().to_string())
                    .unwrap_or(id);
                (value, type_name)
            }
            CallTarget::Instance { value, type_name } => (value, type_name),
        };

        let descriptor = self
            .types
            .get(&type_name)
            .ok_or_else(|| ContainerError::unknown_type(&type_name))?;
        let found = descriptor
            .method(method)
            .ok_or_else(|| ContainerError::unknown_method(&type_name, method))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name.as_str(),
            method = method,
            "Invoking declared method"
        );

        let mut values = Vec::with_capacity(found.parameters().len());
        for slot in found.parameters() {
            values.push(resolve_slot(self, &type_name, slot, &parameters)?);
        }

        found.apply(value.as_any(), ResolvedArgs::new(&type_name, values))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of registered factories.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if no factories are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// All bound identifiers.
    pub fn identifiers(&self) -> Vec<String> {
        self.registry.identifiers()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registry", &self.registry)
            .field("types", &self.types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Slot;
    use crate::params;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Logger {
        level: String,
    }

    fn register_logger(container: &Container) {
        container.register_type(
            TypeDescriptor::builder::<Logger>("Logger")
                .constructor([Slot::new("level").with_default(String::from("info"))], |args| {
                    Ok(Logger {
                        level: args.value(0)?,
                    })
                })
                .build(),
        );
    }

    #[test]
    fn make_auto_binds_with_parameters() {
        let container = Container::new();
        register_logger(&container);

        assert!(!container.has("Logger"));
        let value = container
            .make("Logger", params! { "level" => String::from("debug") })
            .unwrap();
        assert_eq!(value.downcast_ref::<Logger>().unwrap().level, "debug");

        // The auto-bound factory persists, parameters included.
        assert!(container.has("Logger"));
        let again = container.make("Logger", ParameterCollection::new()).unwrap();
        assert_eq!(again.downcast_ref::<Logger>().unwrap().level, "debug");
    }

    #[test]
    fn get_on_unbound_is_not_found() {
        let container = Container::new();
        let err = container.get("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn make_on_undescribed_type_fails() {
        let container = Container::new();
        let err = container
            .make("Ghost", ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::UnknownType { .. }));
    }

    #[test]
    fn singleton_producer_runs_once() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let _ = container.singleton_factory("counter", |_, _| {
            Ok(Value::new(BUILDS.fetch_add(1, Ordering::SeqCst)))
        });

        let first = container.get("counter").unwrap();
        let second = container.get("counter").unwrap();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn transient_producer_runs_every_time() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let _ = container.bind_factory("counter", |_, _| {
            Ok(Value::new(BUILDS.fetch_add(1, Ordering::SeqCst)))
        });

        let first = container.get("counter").unwrap();
        let second = container.get("counter").unwrap();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 2);
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn rebinding_resets_the_cache() {
        let container = Container::new();
        let _ = container.singleton_factory("svc", |_, _| Ok(Value::new("old")));
        let cached = container.get("svc").unwrap();
        assert_eq!(cached.downcast_ref::<&str>(), Some(&"old"));

        let _ = container.singleton_factory("svc", |_, _| Ok(Value::new("new")));
        let fresh = container.get("svc").unwrap();
        assert_eq!(fresh.downcast_ref::<&str>(), Some(&"new"));
        assert!(!fresh.ptr_eq(&cached));
    }

    #[test]
    fn instance_bypasses_factories() {
        let container = Container::new();
        let _ = container.bind_factory("cfg", |_, _| Ok(Value::new(0u8)));

        container.instance("cfg", Value::new(9u8));
        assert!(container.has("cfg"));

        let a = container.get("cfg").unwrap();
        let b = container.get("cfg").unwrap();
        assert_eq!(a.downcast_ref::<u8>(), Some(&9));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn rebinding_replaces_direct_instance() {
        let container = Container::new();
        container.instance("cfg", Value::new(1u8));

        let _ = container.bind_factory("cfg", |_, _| Ok(Value::new(2u8)));
        let value = container.get("cfg").unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&2));
    }

    #[test]
    fn as_singleton_upgrades_binding() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let _ = container
            .bind_factory("svc", |_, _| {
                Ok(Value::new(BUILDS.fetch_add(1, Ordering::SeqCst)))
            })
            .as_singleton();

        let _ = container.get("svc").unwrap();
        let _ = container.get("svc").unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bind_type_separates_id_from_type() {
        let container = Container::new();
        register_logger(&container);

        let _ = container.bind_type("app-log", "Logger");
        let value = container.get("app-log").unwrap();
        assert_eq!(value.downcast_ref::<Logger>().unwrap().level, "info");
    }

    #[test]
    fn call_resolves_method_parameters() {
        struct Greeter {
            greeting: String,
        }

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Greeter>("Greeter")
                .constructor([Slot::new("greeting").with_default(String::from("hello"))], |args| {
                    Ok(Greeter {
                        greeting: args.value(0)?,
                    })
                })
                .method("greet", [Slot::new("name")], |greeter, args| {
                    let name: String = args.value(0)?;
                    Ok(Value::new(format!("{} {}", greeter.greeting, name)))
                })
                .build(),
        );

        let result = container
            .call("Greeter", "greet", params! { "name" => String::from("world") })
            .unwrap();
        assert_eq!(result.downcast_ref::<String>().unwrap(), "hello world");
    }

    #[test]
    fn call_on_existing_instance() {
        struct Greeter {
            greeting: String,
        }

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Greeter>("Greeter")
                .method("greeting", [], |greeter, _| {
                    Ok(Value::new(greeter.greeting.clone()))
                })
                .build(),
        );

        let greeter = Value::new(Greeter {
            greeting: "hey".into(),
        });
        let result = container
            .call(
                CallTarget::instance(greeter, "Greeter"),
                "greeting",
                ParameterCollection::new(),
            )
            .unwrap();
        assert_eq!(result.downcast_ref::<String>().unwrap(), "hey");
    }

    #[test]
    fn call_unknown_method_fails() {
        #[derive(Default)]
        struct Greeter;

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Greeter>("Greeter")
                .default_constructor()
                .build(),
        );

        let err = container
            .call("Greeter", "missing", ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::UnknownMethod { .. }));
    }

    #[test]
    fn clones_share_state() {
        let container = Container::new();
        let clone = container.clone();

        container.instance("cfg", Value::new(5u8));
        assert!(clone.has("cfg"));
    }

    #[test]
    fn config_seeds_factories() {
        let container = Container::with_config(Config {
            resolver: Arc::new(ConstructorResolver::new()),
            factories: vec![Factory::new(
                "answer",
                Producer::Instance(Value::new(42u32)),
                true,
            )],
        });

        assert!(container.has("answer"));
        assert_eq!(container.len(), 1);
        assert_eq!(
            container.get("answer").unwrap().downcast_ref::<u32>(),
            Some(&42)
        );
    }
}
