//! Field resolvers.
//!
//! A [`Resolver`] produces the value of one field given its parent value.
//! Resolvers are registered per `(type, field)` in a [`ResolverMap`]; fields
//! without one fall back to reading the property of the same name from the
//! parent object.

use crate::context::Context;
use crate::extensions::Extensions;
use crate::response::{FieldError, PathSegment};
use crate::schema::TypeRef;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::{self, Future};
use std::marker::PhantomData;
use std::pin::Pin;
use thiserror::Error;

/// Field arguments, in selection order.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    values: IndexMap<String, Value>,
}

impl ResolverArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of an argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Decodes an optional argument. Absent and `null` arguments give `None`.
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ResolverError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| ResolverError::InvalidArgument {
                    name: name.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Decodes a required argument.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.decode(name)?
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
    }

    /// Sets an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for ResolverArgs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// What a resolver knows about the field instance it is resolving.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    pub field_name: String,
    /// Type the field is selected on.
    pub parent_type: String,
    /// Declared return type of the field.
    pub return_type: TypeRef,
    /// Response path, including list indices.
    pub path: Vec<PathSegment>,
    /// Values attached to this field invocation by plugins.
    pub extensions: Extensions,
}

impl ResolverInfo {
    /// Creates info for a `String` field with an empty path.
    pub fn new(field_name: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type: parent_type.into(),
            return_type: TypeRef::named("String"),
            path: Vec::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_return_type(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Returns true if the field is selected directly on the operation root.
    pub fn is_root_field(&self) -> bool {
        self.path.len() == 1
    }
}

/// Result of resolving one field.
pub type ResolverResult = Result<Value, ResolverError>;

/// Boxed future returned by [`Resolver::resolve`].
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// A field resolution failure. It becomes a [`FieldError`] in the response.
#[derive(Debug, Clone, Error)]
pub enum ResolverError {
    #[error("cannot read field `{0}` from a non-object value")]
    NotAnObject(String),

    #[error("missing required argument `{0}`")]
    MissingArgument(String),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Custom(String),

    /// The resolved value could not be completed against the field's type.
    #[error("{0}")]
    Completion(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolverError> for FieldError {
    fn from(error: ResolverError) -> Self {
        FieldError::new(error.to_string())
    }
}

/// Resolves the value of a field.
pub trait Resolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a>;
}

/// Adapts a synchronous function into a [`Resolver`].
pub struct FnResolver<F> {
    func: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Resolver for FnResolver<F>
where
    F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult + Send + Sync,
{
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        Box::pin(future::ready((self.func)(parent, args, ctx, info)))
    }
}

/// Adapts an async function into a [`Resolver`]. The function receives owned
/// copies of its inputs so the future it returns can be `'static`.
pub struct AsyncFnResolver<F, Fut> {
    func: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnResolver<F, Fut>
where
    F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync,
    Fut: Future<Output = ResolverResult> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _future: PhantomData,
        }
    }
}

impl<F, Fut> Resolver for AsyncFnResolver<F, Fut>
where
    F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync,
    Fut: Future<Output = ResolverResult> + Send + 'static,
{
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        Box::pin((self.func)(
            parent.clone(),
            args.clone(),
            ctx.clone(),
            info.clone(),
        ))
    }
}

/// Reads the property named after the field from the parent object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyResolver;

impl Resolver for PropertyResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let result = match parent {
            Value::Object(fields) => Ok(fields.get(&info.field_name).cloned().unwrap_or_default()),
            Value::Null => Ok(Value::Null),
            _ => Err(ResolverError::NotAnObject(info.field_name.clone())),
        };
        Box::pin(future::ready(result))
    }
}

/// Resolvers keyed by type name, then field name.
pub struct ResolverMap {
    by_type: FxHashMap<String, FxHashMap<String, Box<dyn Resolver>>>,
    fallback: Box<dyn Resolver>,
}

impl Default for ResolverMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverMap {
    /// Creates a map whose unregistered fields use [`PropertyResolver`].
    pub fn new() -> Self {
        Self {
            by_type: FxHashMap::default(),
            fallback: Box::new(PropertyResolver),
        }
    }

    /// Registers a resolver, replacing any previous one for the same field.
    pub fn register<R: Resolver + 'static>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: R,
    ) {
        self.by_type
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), Box::new(resolver));
    }

    /// Registers a synchronous function.
    pub fn register_fn<F>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        func: F,
    ) where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        self.register(type_name, field_name, FnResolver::new(func));
    }

    /// Registers an async function.
    pub fn register_async<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        func: F,
    ) where
        F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(type_name, field_name, AsyncFnResolver::new(func));
    }

    /// Returns the resolver registered for a field, if any.
    pub fn registered(&self, type_name: &str, field_name: &str) -> Option<&dyn Resolver> {
        self.by_type
            .get(type_name)?
            .get(field_name)
            .map(|resolver| resolver.as_ref())
    }

    /// Returns the resolver to run for a field.
    pub fn get(&self, type_name: &str, field_name: &str) -> &dyn Resolver {
        self.registered(type_name, field_name)
            .unwrap_or(self.fallback.as_ref())
    }

    /// Replaces the resolver used for unregistered fields.
    pub fn set_fallback<R: Resolver + 'static>(&mut self, resolver: R) {
        self.fallback = Box::new(resolver);
    }
}

impl fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverMap")
            .field(
                "fields",
                &self.by_type.values().map(|fields| fields.len()).sum::<usize>(),
            )
            .finish_non_exhaustive()
    }
}
