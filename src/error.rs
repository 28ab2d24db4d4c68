//! Error types for container operations

use thiserror::Error;

/// Errors raised while binding or resolving container entries.
///
/// `NotFound` is the strict-accessor specialization: only [`Container::get`]
/// raises it, and only when the identifier has neither a cached instance nor
/// a registered factory. Every other failure in the resolution chain is a
/// general container error and propagates unchanged to the caller.
///
/// [`Container::get`]: crate::Container::get
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// Identifier has no binding in the container
    #[error("binding not found in container: {id}")]
    NotFound { id: String },

    /// No type descriptor is registered under this name
    #[error("type is not registered: {type_name}")]
    UnknownType { type_name: String },

    /// A required slot had no bound parameter, no resolvable type and no default
    #[error("parameter is not bound: {name} (resolving {type_name})")]
    ParameterNotBound { name: String, type_name: String },

    /// The dependency graph cycled back into a type already being resolved
    #[error("circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// The type descriptor declares no method with this name
    #[error("method is not declared: {method} on {type_name}")]
    UnknownMethod { type_name: String, method: String },

    /// A value could not be downcast to the requested type
    #[error("type mismatch for {context}: expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        context: String,
    },

    /// A constructor, property assignment or setter invocation failed
    #[error("failed to construct {type_name}: {reason}")]
    ConstructionFailed { type_name: String, reason: String },

    /// Internal error
    #[error("internal container error: {0}")]
    Internal(String),
}

impl ContainerError {
    /// Create a `NotFound` error for an identifier
    #[inline]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an `UnknownType` error
    #[inline]
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create a `ParameterNotBound` error
    #[inline]
    pub fn parameter_not_bound(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::ParameterNotBound {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a `CircularDependency` error from a resolution path
    #[inline]
    pub fn circular(path: impl Into<String>) -> Self {
        Self::CircularDependency { path: path.into() }
    }

    /// Create an `UnknownMethod` error
    #[inline]
    pub fn unknown_method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    /// Create a `TypeMismatch` error for an expected type `T`
    #[inline]
    pub fn type_mismatch<T>(context: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
            context: context.into(),
        }
    }

    /// Create a `ConstructionFailed` error
    #[inline]
    pub fn construction_failed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// True if this is the strict-accessor `NotFound` error
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;
