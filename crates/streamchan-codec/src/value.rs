use std::any::{Any, TypeId};
use std::fmt;

/// An application value of any concrete type, carried opaquely.
///
/// The bridge never looks inside a `Value`; only a [`TypeRegistry`]
/// that knows the concrete type can put it on the wire.
///
/// [`TypeRegistry`]: crate::registry::TypeRegistry
pub struct Value {
    inner: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a concrete value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        self.inner.as_ref().type_id()
    }

    /// Returns true if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrow the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Take the wrapped value as a `T`, or get the `Value` back.
    pub fn downcast<T: Any>(self) -> Result<T, Value> {
        let type_name = self.type_name;
        match self.inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Value { inner, type_name }),
        }
    }

    pub(crate) fn as_any(&self) -> &(dyn Any + Send) {
        self.inner.as_ref()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
