//! Factories: the stored recipes for building an identifier's value
//!
//! A [`Factory`] couples an identifier with a [`Producer`], a singleton flag
//! and the parameters bound to it. The producer is an enum rather than a
//! trait object: the three ways a binding can produce a value are a closed
//! set, and a tagged variant keeps ownership of captured state auditable.

use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::error::Result;
use crate::parameter::{Parameter, ParameterCollection};
use crate::value::Value;

#[cfg(feature = "logging")]
use tracing::trace;

/// Closure producer signature: invoked with the container and the factory's
/// bound parameters.
pub type ProducerFn = Arc<dyn Fn(&Container, &ParameterCollection) -> Result<Value> + Send + Sync>;

/// How a factory produces its value.
#[derive(Clone)]
pub enum Producer {
    /// Return a pre-built value as-is (always singleton in effect)
    Instance(Value),
    /// Delegate to the container's active resolver strategy for a type name
    Type(String),
    /// Invoke a caller-supplied closure
    Closure(ProducerFn),
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(value) => f.debug_tuple("Instance").field(value).finish(),
            Self::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Self::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

/// The stored recipe for one identifier.
///
/// Created by the container's `bind` family; mutated through
/// [`FactoryHandle`] before first resolution. Cloneable so the registry can
/// hand out a snapshot without holding a map guard across the recursive
/// producer call.
#[derive(Debug, Clone)]
pub struct Factory {
    id: String,
    producer: Producer,
    singleton: bool,
    parameters: ParameterCollection,
}

impl Factory {
    /// Create a factory.
    pub fn new(id: impl Into<String>, producer: Producer, singleton: bool) -> Self {
        Self {
            id: id.into(),
            producer,
            singleton,
            parameters: ParameterCollection::new(),
        }
    }

    /// The identifier this factory builds.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The producer variant.
    #[inline]
    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// Whether the produced value is cached and reused.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub(crate) fn set_singleton(&mut self, singleton: bool) {
        self.singleton = singleton;
    }

    /// The parameters bound to this factory.
    #[inline]
    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    /// Bind a parameter, overwriting a prior one of the same name.
    pub fn bind_parameter(&mut self, parameter: Parameter) {
        self.parameters.set(parameter);
    }

    /// The type name this factory produces, for descriptor lookup.
    ///
    /// Resolver-backed factories name their target type; for the other
    /// variants the identifier itself is the best available name.
    pub(crate) fn produced_type(&self) -> &str {
        match &self.producer {
            Producer::Type(type_name) => type_name,
            _ => &self.id,
        }
    }

    /// Run the producer against the container.
    pub fn produce(&self, container: &Container) -> Result<Value> {
        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            id = self.id.as_str(),
            producer = match &self.producer {
                Producer::Instance(_) => "instance",
                Producer::Type(_) => "type",
                Producer::Closure(_) => "closure",
            },
            singleton = self.singleton,
            "Invoking factory producer"
        );

        match &self.producer {
            Producer::Instance(value) => Ok(value.clone()),
            Producer::Type(type_name) => {
                container
                    .resolver()
                    .resolve(container, type_name, &self.parameters)
            }
            Producer::Closure(producer) => producer(container, &self.parameters),
        }
    }
}

/// Chainable handle to a freshly stored factory.
///
/// Returned by the container's `bind` family so bindings read fluently:
///
/// ```rust
/// use keyed_injector::{Container, Slot, TypeDescriptor};
///
/// struct Database { dsn: String }
///
/// let container = Container::new();
/// container.register_type(
///     TypeDescriptor::builder::<Database>("Database")
///         .constructor([Slot::new("dsn")], |args| {
///             Ok(Database { dsn: args.value(0)? })
///         })
///         .build(),
/// );
///
/// container
///     .singleton_type("db", "Database")
///     .bind_parameter("dsn", String::from("mysql://localhost"));
///
/// let db = container.get("db").unwrap();
/// assert_eq!(db.downcast_ref::<Database>().unwrap().dsn, "mysql://localhost");
/// ```
///
/// Mutating a factory after its first resolution is undefined in effect:
/// a cached singleton instance is not rebuilt.
#[derive(Debug)]
pub struct FactoryHandle<'c> {
    container: &'c Container,
    id: String,
}

impl<'c> FactoryHandle<'c> {
    pub(crate) fn new(container: &'c Container, id: String) -> Self {
        Self { container, id }
    }

    /// The bound identifier.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mark the factory as a singleton.
    pub fn as_singleton(self) -> Self {
        self.container
            .registry()
            .update_factory(&self.id, |factory| factory.set_singleton(true));
        self
    }

    /// Bind a literal parameter.
    pub fn bind_parameter<T: Send + Sync + 'static>(self, name: &str, value: T) -> Self {
        self.bind(Parameter::new(name, value))
    }

    /// Bind an already erased parameter value.
    pub fn bind_value(self, name: &str, value: Value) -> Self {
        self.bind(Parameter::literal(name, value))
    }

    /// Bind a deferred parameter, computed against the container on every
    /// fetch.
    pub fn bind_parameter_with<F>(self, name: &str, producer: F) -> Self
    where
        F: Fn(&Container) -> Value + Send + Sync + 'static,
    {
        self.bind(Parameter::produced(name, producer))
    }

    fn bind(self, parameter: Parameter) -> Self {
        self.container
            .registry()
            .update_factory(&self.id, |factory| factory.bind_parameter(parameter));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Marker(u32);

    #[test]
    fn instance_producer_returns_same_value() {
        let container = Container::new();
        let factory = Factory::new("m", Producer::Instance(Value::new(Marker(5))), true);

        let a = factory.produce(&container).unwrap();
        let b = factory.produce(&container).unwrap();

        assert_eq!(a.downcast_ref::<Marker>().unwrap().0, 5);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn closure_producer_runs_every_time() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let factory = Factory::new(
            "m",
            Producer::Closure(Arc::new(|_, _| {
                Ok(Value::new(Marker(CALLS.fetch_add(1, Ordering::SeqCst))))
            })),
            false,
        );

        let a = factory.produce(&container).unwrap();
        let b = factory.produce(&container).unwrap();

        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn closure_producer_sees_bound_parameters() {
        let container = Container::new();
        let mut factory = Factory::new(
            "m",
            Producer::Closure(Arc::new(|container, parameters| {
                let seed = parameters
                    .get("seed")
                    .map(|p| p.get_value(container))
                    .and_then(|v| v.cloned::<u32>())
                    .unwrap_or(0);
                Ok(Value::new(Marker(seed)))
            })),
            false,
        );
        factory.bind_parameter(Parameter::new("seed", 11u32));

        let value = factory.produce(&container).unwrap();
        assert_eq!(value.downcast_ref::<Marker>().unwrap().0, 11);
    }

    #[test]
    fn produced_type_prefers_type_producer() {
        let by_type = Factory::new("db", Producer::Type("Database".into()), false);
        assert_eq!(by_type.produced_type(), "Database");

        let by_instance = Factory::new("db", Producer::Instance(Value::new(1u8)), true);
        assert_eq!(by_instance.produced_type(), "db");
    }
}
