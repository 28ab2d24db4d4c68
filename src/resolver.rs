//! Resolver strategies: constructor, property and setter injection
//!
//! A [`Resolver`] turns a type name plus bound parameters into a fully
//! constructed instance, recursively resolving every dependency slot. The
//! property and setter strategies hold a [`ConstructorResolver`] and run it
//! first, then inject the extra slots — explicit composition, with the slot
//! precedence rules shared as a free function.
//!
//! Strategies carry no state across calls; every resolution is a fresh
//! recursive descent, memoized only by the container's singleton cache, and
//! the first unresolvable dependency fails the whole construction.

use std::any::Any;
use std::cell::RefCell;

use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::metadata::{ResolvedArgs, Slot, TypeDescriptor};
use crate::parameter::ParameterCollection;
use crate::value::Value;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A pluggable resolution strategy.
pub trait Resolver: Send + Sync {
    /// Produce an instance of `type_name`, using `parameters` as explicit
    /// per-slot overrides.
    fn resolve(
        &self,
        container: &Container,
        type_name: &str,
        parameters: &ParameterCollection,
    ) -> Result<Value>;
}

// =============================================================================
// Resolution stack (cycle guard)
// =============================================================================

thread_local! {
    /// Type names currently being resolved on this thread, outermost first.
    ///
    /// Resolution is synchronous and strictly nested, so a plain LIFO stack
    /// mirrors the call tree exactly. A type re-entering the stack means the
    /// dependency graph cycled.
    static RESOLUTION_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// RAII entry on the resolution stack; pops on drop.
struct StackGuard;

impl StackGuard {
    fn enter(type_name: &str) -> Result<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|entry| entry == type_name) {
                let mut path = stack.join(" -> ");
                path.push_str(" -> ");
                path.push_str(type_name);

                #[cfg(feature = "logging")]
                debug!(
                    target: "keyed_injector",
                    path = path.as_str(),
                    "Aborting resolution: dependency graph cycled"
                );

                return Err(ContainerError::circular(path));
            }
            stack.push(type_name.to_string());
            Ok(StackGuard)
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Shared slot resolution
// =============================================================================

/// Resolve one dependency slot against the container.
///
/// Precedence, highest first:
/// 1. An explicit bound parameter named after the slot — evaluated and used,
///    shadowing automatic wiring even for typed slots.
/// 2. A resolvable type hint — recursively resolved via `make`.
/// 3. The slot's declared default.
/// 4. Failure: the parameter is not bound.
pub(crate) fn resolve_slot(
    container: &Container,
    type_name: &str,
    slot: &Slot,
    bound: &ParameterCollection,
) -> Result<Value> {
    if let Some(parameter) = bound.get(slot.name()) {
        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name,
            slot = slot.name(),
            source = "bound_parameter",
            "Filling dependency slot"
        );
        return Ok(parameter.get_value(container));
    }

    if let Some(hint) = slot.type_hint() {
        if container.can_resolve(hint) {
            #[cfg(feature = "logging")]
            trace!(
                target: "keyed_injector",
                type_name = type_name,
                slot = slot.name(),
                source = "type_hint",
                hint = hint,
                "Filling dependency slot"
            );
            return container.make(hint, ParameterCollection::new());
        }
    }

    if let Some(default) = slot.default() {
        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name,
            slot = slot.name(),
            source = "default",
            "Filling dependency slot"
        );
        return Ok(default.clone());
    }

    Err(ContainerError::parameter_not_bound(slot.name(), type_name))
}

fn descriptor_for(container: &Container, type_name: &str) -> Result<std::sync::Arc<TypeDescriptor>> {
    container
        .type_registry()
        .get(type_name)
        .ok_or_else(|| ContainerError::unknown_type(type_name))
}

// =============================================================================
// Constructor strategy
// =============================================================================

/// The default strategy: resolve the constructor slots and invoke the
/// construct closure positionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorResolver;

impl ConstructorResolver {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }

    /// Run the constructor phase, returning the still-mutable instance.
    ///
    /// Shared with the property and setter strategies, which inject into
    /// the boxed instance before it is frozen behind an `Arc`. The caller
    /// is responsible for holding the resolution-stack guard.
    pub(crate) fn construct(
        &self,
        container: &Container,
        descriptor: &TypeDescriptor,
        parameters: &ParameterCollection,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        let slots = descriptor.constructor_slots();
        let mut values = Vec::with_capacity(slots.len());
        for slot in slots {
            values.push(resolve_slot(container, descriptor.name(), slot, parameters)?);
        }

        descriptor.construct(ResolvedArgs::new(descriptor.name(), values))
    }
}

impl Resolver for ConstructorResolver {
    fn resolve(
        &self,
        container: &Container,
        type_name: &str,
        parameters: &ParameterCollection,
    ) -> Result<Value> {
        let descriptor = descriptor_for(container, type_name)?;
        let _guard = StackGuard::enter(type_name)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name,
            strategy = "constructor",
            slots = descriptor.constructor_slots().len(),
            "Resolving type"
        );

        let instance = self.construct(container, &descriptor, parameters)?;
        Ok(Value::from_boxed(instance))
    }
}

// =============================================================================
// Property strategy
// =============================================================================

/// Constructor resolution first, then direct assignment of every declared
/// property slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyResolver {
    constructor: ConstructorResolver,
}

impl PropertyResolver {
    /// Create the strategy.
    pub fn new() -> Self {
        Self {
            constructor: ConstructorResolver::new(),
        }
    }
}

impl Resolver for PropertyResolver {
    fn resolve(
        &self,
        container: &Container,
        type_name: &str,
        parameters: &ParameterCollection,
    ) -> Result<Value> {
        let descriptor = descriptor_for(container, type_name)?;
        let _guard = StackGuard::enter(type_name)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name,
            strategy = "property",
            properties = descriptor.properties().len(),
            "Resolving type"
        );

        let mut instance = self.constructor.construct(container, &descriptor, parameters)?;

        for property in descriptor.properties() {
            let value = resolve_slot(container, type_name, property.slot(), parameters)?;
            property.apply(&mut *instance, value)?;
        }

        Ok(Value::from_boxed(instance))
    }
}

// =============================================================================
// Setter strategy
// =============================================================================

/// Constructor resolution first, then invocation of every declared setter
/// method with its resolved arguments, in declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetterResolver {
    constructor: ConstructorResolver,
}

impl SetterResolver {
    /// Create the strategy.
    pub fn new() -> Self {
        Self {
            constructor: ConstructorResolver::new(),
        }
    }
}

impl Resolver for SetterResolver {
    fn resolve(
        &self,
        container: &Container,
        type_name: &str,
        parameters: &ParameterCollection,
    ) -> Result<Value> {
        let descriptor = descriptor_for(container, type_name)?;
        let _guard = StackGuard::enter(type_name)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            type_name = type_name,
            strategy = "setter",
            setters = descriptor.setters().len(),
            "Resolving type"
        );

        let mut instance = self.constructor.construct(container, &descriptor, parameters)?;

        for setter in descriptor.setters() {
            let mut values = Vec::with_capacity(setter.parameters().len());
            for slot in setter.parameters() {
                values.push(resolve_slot(container, type_name, slot, parameters)?);
            }
            setter.apply(&mut *instance, ResolvedArgs::new(type_name, values))?;
        }

        Ok(Value::from_boxed(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeDescriptor;
    use crate::params;
    use std::sync::Arc;

    struct Logger {
        level: String,
    }

    struct Database {
        dsn: String,
        logger: Option<Arc<Logger>>,
    }

    fn container_with_logger() -> Container {
        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Logger>("Logger")
                .constructor([Slot::new("level").with_default(String::from("info"))], |args| {
                    Ok(Logger {
                        level: args.value(0)?,
                    })
                })
                .build(),
        );
        container
    }

    #[test]
    fn typed_slot_resolves_through_container() {
        let container = container_with_logger();
        container.register_type(
            TypeDescriptor::builder::<Database>("Database")
                .constructor(
                    [Slot::typed("logger", "Logger"), Slot::new("dsn")],
                    |args| {
                        Ok(Database {
                            logger: Some(args.arc(0)?),
                            dsn: args.value(1)?,
                        })
                    },
                )
                .build(),
        );

        let resolver = ConstructorResolver::new();
        let value = resolver
            .resolve(
                &container,
                "Database",
                &params! { "dsn" => String::from("sqlite::memory:") },
            )
            .unwrap();

        let db = value.downcast_ref::<Database>().unwrap();
        assert_eq!(db.dsn, "sqlite::memory:");
        assert_eq!(db.logger.as_ref().unwrap().level, "info");
    }

    #[test]
    fn explicit_parameter_shadows_typed_slot() {
        let container = container_with_logger();
        container.register_type(
            TypeDescriptor::builder::<Database>("Database")
                .constructor([Slot::typed("logger", "Logger")], |args| {
                    Ok(Database {
                        logger: Some(args.arc(0)?),
                        dsn: String::new(),
                    })
                })
                .build(),
        );

        let override_logger = Arc::new(Logger {
            level: "debug".into(),
        });
        let parameters = ParameterCollection::new().with(crate::Parameter::literal(
            "logger",
            Value::from_arc(Arc::clone(&override_logger)),
        ));

        let value = ConstructorResolver::new()
            .resolve(&container, "Database", &parameters)
            .unwrap();

        let db = value.downcast_ref::<Database>().unwrap();
        assert!(Arc::ptr_eq(db.logger.as_ref().unwrap(), &override_logger));
    }

    #[test]
    fn unresolvable_hint_falls_back_to_default() {
        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Logger>("Logger")
                .constructor(
                    [Slot::typed("level", "LogLevel").with_default(String::from("warn"))],
                    |args| {
                        Ok(Logger {
                            level: args.value(0)?,
                        })
                    },
                )
                .build(),
        );

        let value = ConstructorResolver::new()
            .resolve(&container, "Logger", &ParameterCollection::new())
            .unwrap();
        assert_eq!(value.downcast_ref::<Logger>().unwrap().level, "warn");
    }

    #[test]
    fn missing_required_parameter_fails() {
        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Logger>("Logger")
                .constructor([Slot::new("level")], |args| {
                    Ok(Logger {
                        level: args.value(0)?,
                    })
                })
                .build(),
        );

        let err = ConstructorResolver::new()
            .resolve(&container, "Logger", &ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ContainerError::ParameterNotBound { ref name, .. } if name == "level"
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let container = Container::new();
        let err = ConstructorResolver::new()
            .resolve(&container, "Ghost", &ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::UnknownType { .. }));
    }

    #[test]
    fn property_strategy_injects_after_construction() {
        let container = container_with_logger();
        container.register_type(
            TypeDescriptor::builder::<Database>("Database")
                .constructor([Slot::new("dsn")], |args| {
                    Ok(Database {
                        dsn: args.value(0)?,
                        logger: None,
                    })
                })
                .property(Slot::typed("logger", "Logger"), |db, value| {
                    db.logger = value.downcast_arc::<Logger>();
                    Ok(())
                })
                .build(),
        );

        let value = PropertyResolver::new()
            .resolve(
                &container,
                "Database",
                &params! { "dsn" => String::from("pg://localhost") },
            )
            .unwrap();

        let db = value.downcast_ref::<Database>().unwrap();
        assert_eq!(db.dsn, "pg://localhost");
        assert_eq!(db.logger.as_ref().unwrap().level, "info");
    }

    #[test]
    fn setter_strategy_runs_in_declaration_order() {
        struct Audit {
            trail: Vec<&'static str>,
        }

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Audit>("Audit")
                .constructor([], |_| Ok(Audit { trail: Vec::new() }))
                .setter("set_first", [], |audit, _| {
                    audit.trail.push("first");
                    Ok(())
                })
                .setter("set_second", [], |audit, _| {
                    audit.trail.push("second");
                    Ok(())
                })
                .build(),
        );

        let value = SetterResolver::new()
            .resolve(&container, "Audit", &ParameterCollection::new())
            .unwrap();
        assert_eq!(value.downcast_ref::<Audit>().unwrap().trail, ["first", "second"]);
    }

    #[test]
    fn setter_arguments_follow_slot_precedence() {
        let container = container_with_logger();
        container.register_type(
            TypeDescriptor::builder::<Database>("Database")
                .constructor([], |_| {
                    Ok(Database {
                        dsn: String::new(),
                        logger: None,
                    })
                })
                .setter(
                    "set_connection",
                    [Slot::typed("logger", "Logger"), Slot::new("dsn")],
                    |db, args| {
                        db.logger = Some(args.arc(0)?);
                        db.dsn = args.value(1)?;
                        Ok(())
                    },
                )
                .build(),
        );

        let value = SetterResolver::new()
            .resolve(
                &container,
                "Database",
                &params! { "dsn" => String::from("mysql://localhost") },
            )
            .unwrap();

        let db = value.downcast_ref::<Database>().unwrap();
        assert_eq!(db.dsn, "mysql://localhost");
        assert_eq!(db.logger.as_ref().unwrap().level, "info");
    }

    #[test]
    fn constructor_cycle_is_detected() {
        struct Chicken;

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Chicken>("Chicken")
                .constructor([Slot::typed("parent", "Egg")], |_| Ok(Chicken))
                .build(),
        );
        container.register_type(
            TypeDescriptor::builder::<Chicken>("Egg")
                .constructor([Slot::typed("parent", "Chicken")], |_| Ok(Chicken))
                .build(),
        );

        let err = ConstructorResolver::new()
            .resolve(&container, "Chicken", &ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ContainerError::CircularDependency { ref path } if path == "Chicken -> Egg -> Chicken"
        ));
    }

    #[test]
    fn self_referential_type_is_detected() {
        struct Ouroboros;

        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Ouroboros>("Ouroboros")
                .constructor([Slot::typed("tail", "Ouroboros")], |_| Ok(Ouroboros))
                .build(),
        );

        let err = ConstructorResolver::new()
            .resolve(&container, "Ouroboros", &ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ContainerError::CircularDependency { ref path } if path == "Ouroboros -> Ouroboros"
        ));
    }

    #[test]
    fn property_cycle_is_detected() {
        struct Node {
            peer: Option<Value>,
        }

        let container = Container::with_config(crate::Config {
            resolver: Arc::new(PropertyResolver::new()),
            factories: Vec::new(),
        });
        container.register_type(
            TypeDescriptor::builder::<Node>("NodeA")
                .constructor([], |_| Ok(Node { peer: None }))
                .property(Slot::typed("peer", "NodeB"), |node, value| {
                    node.peer = Some(value);
                    Ok(())
                })
                .build(),
        );
        container.register_type(
            TypeDescriptor::builder::<Node>("NodeB")
                .constructor([], |_| Ok(Node { peer: None }))
                .property(Slot::typed("peer", "NodeA"), |node, value| {
                    node.peer = Some(value);
                    Ok(())
                })
                .build(),
        );

        let err = container
            .make("NodeA", ParameterCollection::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::CircularDependency { .. }));
    }

    #[test]
    fn stack_unwinds_after_failure() {
        let container = Container::new();
        container.register_type(
            TypeDescriptor::builder::<Logger>("Logger")
                .constructor([Slot::new("level")], |args| {
                    Ok(Logger {
                        level: args.value(0)?,
                    })
                })
                .build(),
        );

        let resolver = ConstructorResolver::new();
        assert!(resolver
            .resolve(&container, "Logger", &ParameterCollection::new())
            .is_err());

        // A failed resolution must not leave the type on the stack.
        let value = resolver
            .resolve(
                &container,
                "Logger",
                &params! { "level" => String::from("info") },
            )
            .unwrap();
        assert_eq!(value.downcast_ref::<Logger>().unwrap().level, "info");
    }
}
