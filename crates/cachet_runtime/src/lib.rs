//! Host request pipeline for cachet.
//!
//! This crate provides the GraphQL runtime that cache-control plugins run in:
//! - `schema`: Schema definition and building
//! - `plan`: Pre-planned selection trees
//! - `resolver`: Field resolvers
//! - `executor`: Plan execution
//! - `context` and `response`: What goes into and comes out of a request
//! - `hooks`: Request lifecycle extension points
//! - `extensions`: Type-keyed side channels
//! - `store`: Backing response cache

pub mod context;
pub mod executor;
pub mod extensions;
pub mod hooks;
pub mod plan;
pub mod resolver;
pub mod response;
pub mod schema;
pub mod store;

pub use context::Context;
pub use executor::{ExecutionError, Executor, ExecutorConfig};
pub use extensions::Extensions;
pub use hooks::{DidResolveField, Plugin, RequestListener, ResponseContext};
pub use plan::{FieldSelection, OperationKind, PlanNode, QueryPlan};
pub use resolver::{
    AsyncFnResolver, FnResolver, PropertyResolver, Resolver, ResolverArgs, ResolverError,
    ResolverFuture, ResolverInfo, ResolverMap, ResolverResult,
};
pub use response::{DisplayPath, FieldError, PathSegment, Response};
pub use schema::{
    ArgumentDef, Directive, DirectiveDefinition, DirectiveLocation, EnumDef, FieldDef,
    InterfaceDef, ObjectDef, ScalarDef, Schema, SchemaBuilder, TypeDef, TypeRef, UnionDef,
    BUILTIN_SCALARS,
};
pub use store::{InMemoryLruCache, KeyValueCache};
