//! Per-request context shared by resolvers and plugins.

use crate::extensions::Extensions;

/// Request-scoped inputs supplied by the host.
///
/// Cloning is cheap: extension values are reference counted, so the executor
/// hands every spawned field task its own copy.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Typed values, e.g. a cache policy override.
    pub extensions: Extensions,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed extension value, replacing one of the same type.
    pub fn with_extension<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    pub fn extension<T: 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}
