//! Type-erased values produced and consumed by the container
//!
//! Bindings are keyed by string identifiers, so instances and parameter
//! values travel through the container as `Arc<dyn Any + Send + Sync>`.
//! Unlike a `TypeId`-keyed registry, a string key proves nothing about the
//! stored type, so every downcast here is checked.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased value.
///
/// Produced instances, bound parameter values and slot defaults are all
/// `Value`s. Cloning is cheap (an `Arc` clone) and [`Value::ptr_eq`] gives
/// the identity comparison singletons are tested with.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::Value;
///
/// let value = Value::new(42u32);
/// assert_eq!(value.downcast_ref::<u32>(), Some(&42));
/// assert!(value.downcast_ref::<String>().is_none());
///
/// let same = value.clone();
/// assert!(value.ptr_eq(&same));
/// ```
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap a value.
    #[inline]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Wrap an already shared value without re-allocating.
    #[inline]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: value as Arc<dyn Any + Send + Sync>,
        }
    }

    /// Wrap a freshly constructed boxed instance.
    #[inline]
    pub(crate) fn from_boxed(value: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            inner: Arc::from(value),
        }
    }

    /// Borrow the contained value as `T`, if it is one.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Share the contained value as `Arc<T>`, if it is a `T`.
    #[inline]
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Clone the contained value out as an owned `T`.
    #[inline]
    pub fn cloned<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Check whether the contained value is a `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Identity comparison: true if both values share the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the erased value for method invocation.
    #[inline]
    pub(crate) fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type_id", &self.inner.type_id())
            .finish()
    }
}
