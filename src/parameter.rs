//! Named parameters bound to a factory call
//!
//! A [`Parameter`] carries either a literal value or a producer closure that
//! computes the value against the container. Producers are re-evaluated on
//! every fetch, so they must be side-effect-free or idempotent if the same
//! parameter is consumed by more than one resolution.

use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::value::Value;

/// Producer closure for a deferred parameter value
type ProducerFn = Arc<dyn Fn(&Container) -> Value + Send + Sync>;

/// Where a parameter's value comes from: stored eagerly or computed on fetch.
#[derive(Clone)]
pub enum ValueSource {
    /// An already materialized value
    Literal(Value),
    /// A closure evaluated against the container on every fetch
    Producer(ProducerFn),
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// A named value (or value producer) bound to one dependency slot.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{Container, Parameter, Value};
///
/// let container = Container::new();
///
/// let literal = Parameter::new("dsn", String::from("mysql://localhost"));
/// assert_eq!(
///     literal.get_value(&container).downcast_ref::<String>().unwrap(),
///     "mysql://localhost"
/// );
///
/// let produced = Parameter::produced("retries", |_container| Value::new(3u32));
/// assert_eq!(produced.get_value(&container).downcast_ref::<u32>(), Some(&3));
/// ```
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    source: ValueSource,
}

impl Parameter {
    /// Create a literal parameter from any shareable value.
    #[inline]
    pub fn new<T: Send + Sync + 'static>(name: impl Into<String>, value: T) -> Self {
        Self::literal(name, Value::new(value))
    }

    /// Create a literal parameter from an already erased [`Value`].
    #[inline]
    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            source: ValueSource::Literal(value),
        }
    }

    /// Create a deferred parameter whose value is computed on every fetch.
    #[inline]
    pub fn produced<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&Container) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: ValueSource::Producer(Arc::new(producer)),
        }
    }

    /// The slot name this parameter binds.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the value is sourced.
    #[inline]
    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    /// Fetch the value.
    ///
    /// Literals are cloned (an `Arc` clone, sharing the allocation);
    /// producers are invoked with the container. A producer's result is
    /// never cached here, each call evaluates it again.
    pub fn get_value(&self, container: &Container) -> Value {
        match &self.source {
            ValueSource::Literal(value) => value.clone(),
            ValueSource::Producer(producer) => producer(container),
        }
    }
}

/// An ordered, name-keyed set of parameters bound to one factory call.
///
/// Insertion order is preserved for iteration. Setting a parameter whose
/// name is already present replaces the entry in place, keeping its
/// original position.
#[derive(Debug, Clone, Default)]
pub struct ParameterCollection {
    entries: Vec<Parameter>,
}

impl ParameterCollection {
    /// Create an empty collection.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a parameter, overwriting any prior entry of the same name.
    pub fn set(&mut self, parameter: Parameter) {
        match self.entries.iter_mut().find(|p| p.name() == parameter.name()) {
            Some(existing) => *existing = parameter,
            None => self.entries.push(parameter),
        }
    }

    /// Builder-style [`set`](Self::set).
    #[inline]
    #[must_use]
    pub fn with(mut self, parameter: Parameter) -> Self {
        self.set(parameter);
        self
    }

    /// Check whether a parameter of this name is bound.
    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name() == name)
    }

    /// Get the parameter bound under this name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.name() == name)
    }

    /// Iterate parameters in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    /// Number of bound parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Parameter> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut collection = Self::new();
        for parameter in iter {
            collection.set(parameter);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build a [`ParameterCollection`] from literal `name => value` pairs.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::params;
///
/// let parameters = params! {
///     "dsn" => String::from("mysql://localhost"),
///     "pool_size" => 8u32,
/// };
/// assert_eq!(parameters.len(), 2);
/// assert!(parameters.has("dsn"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::ParameterCollection::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut collection = $crate::ParameterCollection::new();
        $(collection.set($crate::Parameter::new($name, $value));)+
        collection
    }};
}
