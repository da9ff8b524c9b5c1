//! Type-keyed side channel for request, field and response scoped data.
//!
//! Plugins use [`Extensions`] to hand values to resolvers and to downstream
//! consumers without the runtime knowing their types.

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-safe storage keyed by `TypeId`.
///
/// Values are reference counted so that cloning the map (for example when a
/// request context is handed to a spawned task) is cheap.
///
/// # Example
///
/// ```
/// use cachet_runtime::extensions::Extensions;
///
/// #[derive(Debug, PartialEq)]
/// struct RequestId(u64);
///
/// let mut ext = Extensions::new();
/// ext.insert(RequestId(7));
///
/// assert_eq!(ext.get::<RequestId>(), Some(&RequestId(7)));
/// assert!(ext.get::<String>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Extensions {
    data: FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Creates a new empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.data.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Gets a reference to a value by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// Returns true if a value of the given type is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Removes a value by type, returning whether it was present.
    pub fn remove<T: 'static>(&mut self) -> bool {
        self.data.remove(&TypeId::of::<T>()).is_some()
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.data.len())
            .finish()
    }
}
