//! Registration-time type metadata
//!
//! The container never inspects a type at runtime. Instead, each
//! constructible type registers a [`TypeDescriptor`] up front: its
//! constructor slots, injectable properties, setter methods and callable
//! methods, together with plain closures that do the actual construction
//! and assignment. Resolver strategies walk these descriptors to decide
//! what to inject and when.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;

use crate::error::{ContainerError, Result};
use crate::value::Value;

// =============================================================================
// Dependency slots
// =============================================================================

/// One dependency slot: a constructor argument, a property, or a setter
/// argument.
///
/// A slot has a name, optionally a type hint (a container identifier the
/// slot can be auto-wired from) and optionally a default value.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::Slot;
///
/// let untyped = Slot::new("dsn");
/// let typed = Slot::typed("logger", "Logger");
/// let defaulted = Slot::new("pool_size").with_default(4u32);
///
/// assert!(untyped.type_hint().is_none());
/// assert_eq!(typed.type_hint(), Some("Logger"));
/// assert!(defaulted.default().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Slot {
    name: String,
    type_hint: Option<String>,
    default: Option<Value>,
}

impl Slot {
    /// An untyped slot, filled from bound parameters or its default.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }

    /// A typed slot, auto-wired from the container unless explicitly bound.
    #[inline]
    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(type_hint.into()),
            default: None,
        }
    }

    /// Attach a default value, used when nothing else fills the slot.
    #[inline]
    #[must_use]
    pub fn with_default<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = Some(Value::new(value));
        self
    }

    /// The slot name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type, as a container identifier.
    #[inline]
    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    /// The declared default value.
    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

// =============================================================================
// Resolved arguments
// =============================================================================

/// Slot values resolved for one constructor or method invocation, in
/// declaration order.
///
/// Construction closures pull their arguments out positionally with the
/// checked accessors; a wrong index or type surfaces as a container error
/// rather than a panic.
pub struct ResolvedArgs {
    type_name: String,
    values: Vec<Value>,
}

impl ResolvedArgs {
    pub(crate) fn new(type_name: &str, values: Vec<Value>) -> Self {
        Self {
            type_name: type_name.to_string(),
            values,
        }
    }

    /// Number of resolved arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value at `index`.
    pub fn raw(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or_else(|| {
            ContainerError::Internal(format!(
                "argument {index} out of range for {}",
                self.type_name
            ))
        })
    }

    /// The argument at `index` as a shared `Arc<T>`.
    ///
    /// Use this for resolved dependencies, which are shared instances.
    pub fn arc<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        self.raw(index)?.downcast_arc::<T>().ok_or_else(|| {
            ContainerError::type_mismatch::<T>(format!("argument {index} of {}", self.type_name))
        })
    }

    /// The argument at `index` cloned out as an owned `T`.
    ///
    /// Use this for literal parameters and defaults.
    pub fn value<T: Clone + 'static>(&self, index: usize) -> Result<T> {
        self.raw(index)?.cloned::<T>().ok_or_else(|| {
            ContainerError::type_mismatch::<T>(format!("argument {index} of {}", self.type_name))
        })
    }
}

impl fmt::Debug for ResolvedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedArgs")
            .field("type_name", &self.type_name)
            .field("len", &self.values.len())
            .finish()
    }
}

// =============================================================================
// Type descriptors
// =============================================================================

type ConstructFn = Arc<dyn Fn(ResolvedArgs) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;
type AssignFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync>;
type MutateFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), ResolvedArgs) -> Result<()> + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&(dyn Any + Send + Sync), ResolvedArgs) -> Result<Value> + Send + Sync>;

/// An injectable property: a slot plus the closure that assigns it.
#[derive(Clone)]
pub struct PropertySlot {
    slot: Slot,
    assign: AssignFn,
}

impl PropertySlot {
    /// The property's dependency slot.
    #[inline]
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub(crate) fn apply(&self, target: &mut (dyn Any + Send + Sync), value: Value) -> Result<()> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertySlot").field(&self.slot).finish()
    }
}

/// A mutator method run by the setter strategy after construction.
#[derive(Clone)]
pub struct SetterMethod {
    name: String,
    parameters: Vec<Slot>,
    invoke: MutateFn,
}

impl SetterMethod {
    /// The method name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method's parameter slots, in declaration order.
    #[inline]
    pub fn parameters(&self) -> &[Slot] {
        &self.parameters
    }

    pub(crate) fn apply(
        &self,
        target: &mut (dyn Any + Send + Sync),
        args: ResolvedArgs,
    ) -> Result<()> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for SetterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterMethod")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A callable method, invoked through [`Container::call`].
///
/// [`Container::call`]: crate::Container::call
#[derive(Clone)]
pub struct Method {
    name: String,
    parameters: Vec<Slot>,
    invoke: InvokeFn,
}

impl Method {
    /// The method name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method's parameter slots, in declaration order.
    #[inline]
    pub fn parameters(&self) -> &[Slot] {
        &self.parameters
    }

    pub(crate) fn apply(
        &self,
        target: &(dyn Any + Send + Sync),
        args: ResolvedArgs,
    ) -> Result<Value> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Registration-time metadata for one constructible type.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{Slot, TypeDescriptor};
///
/// struct Database {
///     dsn: String,
/// }
///
/// let descriptor = TypeDescriptor::builder::<Database>("Database")
///     .constructor([Slot::new("dsn")], |args| {
///         Ok(Database {
///             dsn: args.value(0)?,
///         })
///     })
///     .build();
/// assert_eq!(descriptor.name(), "Database");
/// ```
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    constructor: Vec<Slot>,
    construct: Option<ConstructFn>,
    properties: Vec<PropertySlot>,
    setters: Vec<SetterMethod>,
    methods: Vec<Method>,
}

impl TypeDescriptor {
    /// Start describing a type `T` registered under `name`.
    pub fn builder<T: Send + Sync + 'static>(
        name: impl Into<String>,
    ) -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder {
            name: name.into(),
            constructor: Vec::new(),
            construct: None,
            properties: Vec::new(),
            setters: Vec::new(),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// The identifier this descriptor is registered under.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor slots in declaration order.
    #[inline]
    pub fn constructor_slots(&self) -> &[Slot] {
        &self.constructor
    }

    /// Injectable properties in declaration order.
    #[inline]
    pub fn properties(&self) -> &[PropertySlot] {
        &self.properties
    }

    /// Setter methods in declaration order.
    #[inline]
    pub fn setters(&self) -> &[SetterMethod] {
        &self.setters
    }

    /// Callable methods.
    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Look up a callable method by name.
    #[inline]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Invoke the construct closure with resolved slot values.
    ///
    /// A descriptor registered with neither a constructor nor a default
    /// construct is not instantiable.
    pub(crate) fn construct(&self, args: ResolvedArgs) -> Result<Box<dyn Any + Send + Sync>> {
        match &self.construct {
            Some(construct) => construct(args),
            None => Err(ContainerError::construction_failed(
                &self.name,
                "type is not instantiable: no constructor registered",
            )),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("constructor", &self.constructor)
            .field("properties", &self.properties.len())
            .field("setters", &self.setters.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Typed builder for a [`TypeDescriptor`].
///
/// The builder is generic over the concrete type so every closure is written
/// against `&T`/`&mut T`; the type erasure happens once, here, instead of in
/// user code.
pub struct TypeDescriptorBuilder<T> {
    name: String,
    constructor: Vec<Slot>,
    construct: Option<ConstructFn>,
    properties: Vec<PropertySlot>,
    setters: Vec<SetterMethod>,
    methods: Vec<Method>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeDescriptorBuilder<T> {
    /// Declare the constructor: its slots and the closure that builds `T`
    /// from the resolved slot values, positionally in declaration order.
    #[must_use]
    pub fn constructor<F>(mut self, slots: impl IntoIterator<Item = Slot>, construct: F) -> Self
    where
        F: Fn(ResolvedArgs) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor = slots.into_iter().collect();
        self.construct = Some(Arc::new(move |args| {
            Ok(Box::new(construct(args)?) as Box<dyn Any + Send + Sync>)
        }));
        self
    }

    /// Declare that the type has no constructor and is built bare via
    /// [`Default`].
    #[must_use]
    pub fn default_constructor(mut self) -> Self
    where
        T: Default,
    {
        self.constructor = Vec::new();
        self.construct = Some(Arc::new(|_| {
            Ok(Box::new(T::default()) as Box<dyn Any + Send + Sync>)
        }));
        self
    }

    /// Declare an injectable property: its slot and the assignment closure.
    #[must_use]
    pub fn property<F>(mut self, slot: Slot, assign: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        let slot_name = slot.name().to_string();
        self.properties.push(PropertySlot {
            slot,
            assign: Arc::new(move |target, value| {
                let target = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::type_mismatch::<T>(format!(
                        "property {slot_name} of {type_name}"
                    ))
                })?;
                assign(target, value)
            }),
        });
        self
    }

    /// Declare a setter method: its name, parameter slots and the mutating
    /// closure invoked with the resolved arguments.
    #[must_use]
    pub fn setter<F>(
        mut self,
        name: impl Into<String>,
        slots: impl IntoIterator<Item = Slot>,
        invoke: F,
    ) -> Self
    where
        F: Fn(&mut T, ResolvedArgs) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = self.name.clone();
        let method_name = name.clone();
        self.setters.push(SetterMethod {
            name,
            parameters: slots.into_iter().collect(),
            invoke: Arc::new(move |target, args| {
                let target = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::type_mismatch::<T>(format!(
                        "setter {method_name} of {type_name}"
                    ))
                })?;
                invoke(target, args)
            }),
        });
        self
    }

    /// Declare a callable method, consumed by [`Container::call`].
    ///
    /// [`Container::call`]: crate::Container::call
    #[must_use]
    pub fn method<F>(
        mut self,
        name: impl Into<String>,
        slots: impl IntoIterator<Item = Slot>,
        invoke: F,
    ) -> Self
    where
        F: Fn(&T, ResolvedArgs) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = self.name.clone();
        let method_name = name.clone();
        self.methods.push(Method {
            name,
            parameters: slots.into_iter().collect(),
            invoke: Arc::new(move |target, args| {
                let target = target.downcast_ref::<T>().ok_or_else(|| {
                    ContainerError::type_mismatch::<T>(format!(
                        "method {method_name} of {type_name}"
                    ))
                })?;
                invoke(target, args)
            }),
        });
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            constructor: self.constructor,
            construct: self.construct,
            properties: self.properties,
            setters: self.setters,
            methods: self.methods,
        }
    }
}

// =============================================================================
// Type registry
// =============================================================================

/// Name-keyed store of type descriptors.
pub struct TypeRegistry {
    types: DashMap<String, Arc<TypeDescriptor>, RandomState>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            types: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a descriptor under its name, replacing any prior one.
    pub fn register(&self, descriptor: TypeDescriptor) {
        self.types
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    /// Check whether a descriptor is registered under this name.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Get the descriptor registered under this name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered descriptors.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("count", &self.len())
            .finish()
    }
}
