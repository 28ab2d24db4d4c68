//! # keyed-injector
//!
//! A thread-safe, string-keyed dependency injection container.
//!
//! Identifiers are plain strings bound to factories; factories produce
//! type-erased [`Value`]s either from a pre-built instance, by name through a
//! registered [`TypeDescriptor`], or via a closure. Singleton bindings cache
//! their first instance; rebinding an identifier evicts that cache.
//!
//! Construction metadata is explicit: each constructible type registers a
//! descriptor listing its constructor slots, injectable properties, setters,
//! and callable methods. A pluggable [`Resolver`] strategy decides how much
//! of that descriptor to use — constructor injection only, or constructor
//! plus property or setter injection.
//!
//! ## Quick start
//!
//! ```rust
//! use keyed_injector::{params, Container, Slot, TypeDescriptor};
//!
//! struct Database {
//!     dsn: String,
//! }
//!
//! let container = Container::new();
//!
//! // Describe how a Database is built.
//! container.register_type(
//!     TypeDescriptor::builder::<Database>("Database")
//!         .constructor([Slot::new("dsn")], |args| {
//!             Ok(Database { dsn: args.value(0)? })
//!         })
//!         .build(),
//! );
//!
//! // Bind it as a singleton with its parameter supplied up front.
//! container
//!     .singleton("Database")
//!     .bind_parameter("dsn", String::from("mysql://localhost"));
//!
//! let db = container.get("Database").unwrap();
//! assert_eq!(db.downcast_ref::<Database>().unwrap().dsn, "mysql://localhost");
//!
//! // Parameters can also be passed at resolution time for unbound ids.
//! let other = container
//!     .make("Logger", params! { "level" => String::from("warn") });
//! # let _ = other;
//! ```
//!
//! ## Parameter precedence
//!
//! When a resolver fills a slot it tries, in order:
//!
//! 1. a parameter bound on the factory under the slot's name
//! 2. the slot's type hint, resolved recursively through the container
//! 3. the slot's declared default
//!
//! and fails with [`ContainerError::ParameterNotBound`] if none applies.
//!
//! ## Features
//!
//! - `logging` (default) - emit `tracing` events for binding and resolution
//! - `logging-json` / `logging-pretty` - bundled subscriber setups, see
//!   [`logging`]

mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod metadata;
mod parameter;
mod registry;
mod resolver;
mod value;

pub use container::{CallTarget, Config, Container};
pub use error::{ContainerError, Result};
pub use factory::{Factory, FactoryHandle, Producer, ProducerFn};
pub use metadata::{
    Method, PropertySlot, ResolvedArgs, SetterMethod, Slot, TypeDescriptor, TypeDescriptorBuilder,
    TypeRegistry,
};
pub use parameter::{Parameter, ParameterCollection, ValueSource};
pub use resolver::{ConstructorResolver, PropertyResolver, Resolver, SetterResolver};
pub use value::Value;

#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Commonly used items, importable in one line.
pub mod prelude {
    pub use crate::container::{CallTarget, Config, Container};
    pub use crate::error::{ContainerError, Result};
    pub use crate::metadata::{Slot, TypeDescriptor};
    pub use crate::parameter::{Parameter, ParameterCollection};
    pub use crate::resolver::{ConstructorResolver, PropertyResolver, Resolver, SetterResolver};
    pub use crate::value::Value;
}
