//! Plan execution.
//!
//! [`Executor::execute`] walks a [`QueryPlan`] against the schema, calling a
//! resolver for every field instance and completing its value against the
//! field's declared type. Plugin listeners are notified around each field and
//! around the execution as a whole.

use crate::context::Context;
use crate::extensions::Extensions;
use crate::hooks::{DidResolveField, Plugin, RequestListener, ResponseContext};
use crate::plan::{FieldSelection, OperationKind, PlanNode, QueryPlan};
use crate::resolver::{ResolverArgs, ResolverError, ResolverInfo, ResolverMap};
use crate::response::{DisplayPath, FieldError, PathSegment, Response};
use crate::schema::{FieldDef, Schema, TypeDef, TypeRef};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, trace};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tunables for [`Executor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Spawn the fields of a [`PlanNode::Parallel`] group as separate tasks.
    /// When off, they resolve one after another.
    pub parallel: bool,
    /// Fields nested deeper than this resolve to `null` with an error.
    pub max_depth: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_depth: 32,
        }
    }
}

/// A failure that stops execution before any field resolves.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("schema has no root type for {0:?} operations")]
    MissingRootType(OperationKind),
}

/// Runs query plans against a schema and its resolvers.
pub struct Executor {
    schema: Arc<Schema>,
    resolvers: Arc<ResolverMap>,
    plugins: Vec<Arc<dyn Plugin>>,
    config: ExecutorConfig,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("resolvers", &self.resolvers)
            .field("plugins", &self.plugins.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(schema: Arc<Schema>, resolvers: ResolverMap) -> Self {
        Self {
            schema,
            resolvers: Arc::new(resolvers),
            plugins: Vec::new(),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(self, config: ExecutorConfig) -> Self {
        Self { config, ..self }
    }

    /// Installs a plugin. Plugins are consulted in installation order.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Executes `plan` and returns the response after every listener has
    /// seen it.
    pub async fn execute(&self, plan: &QueryPlan, ctx: &Context) -> Response {
        let listeners: Arc<[Arc<dyn RequestListener>]> = self
            .plugins
            .iter()
            .filter_map(|plugin| plugin.request_did_start(ctx))
            .collect();

        for listener in listeners.iter() {
            listener.execution_did_start().await;
        }

        let mut response = match self.root_type(plan.operation_kind) {
            Ok(root_type) => {
                let run = Run {
                    schema: Arc::clone(&self.schema),
                    resolvers: Arc::clone(&self.resolvers),
                    request: ctx.clone(),
                    config: self.config.clone(),
                    listeners: Arc::clone(&listeners),
                    errors: Arc::default(),
                };
                let data = execute_node(
                    &plan.root,
                    Value::Object(Map::new()),
                    &root_type,
                    Vec::new(),
                    &run,
                )
                .await;

                for listener in listeners.iter() {
                    listener.execution_did_end(None).await;
                }

                let errors = std::mem::take(&mut *run.errors.lock().await);
                debug!(errors = errors.len(), "execution finished");
                Response {
                    errors,
                    ..Response::data(data)
                }
            }
            Err(error) => {
                debug!(%error, "execution aborted");
                for listener in listeners.iter() {
                    listener.execution_did_end(Some(&error)).await;
                }
                Response::error(FieldError::new(error.to_string()))
            }
        };

        let mut outgoing = ResponseContext {
            response: &mut response,
            context: ctx,
        };
        for listener in listeners.iter() {
            listener.will_send_response(&mut outgoing).await;
        }
        response
    }

    fn root_type(&self, kind: OperationKind) -> Result<String, ExecutionError> {
        let root = match kind {
            OperationKind::Query => &self.schema.query_type,
            OperationKind::Mutation => &self.schema.mutation_type,
        };
        root.clone().ok_or(ExecutionError::MissingRootType(kind))
    }
}

/// State shared by every field of one execution.
#[derive(Clone)]
struct Run {
    schema: Arc<Schema>,
    resolvers: Arc<ResolverMap>,
    request: Context,
    config: ExecutorConfig,
    listeners: Arc<[Arc<dyn RequestListener>]>,
    errors: Arc<Mutex<Vec<FieldError>>>,
}

impl Run {
    async fn fail(&self, error: FieldError) {
        self.errors.lock().await.push(error);
    }
}

/// Executes one plan node against `parent`, returning the response object
/// fragment it contributes.
fn execute_node<'a>(
    node: &'a PlanNode,
    parent: Value,
    parent_type: &'a str,
    path: Vec<PathSegment>,
    run: &'a Run,
) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        match node {
            PlanNode::Parallel(nodes) if run.config.parallel && nodes.len() > 1 => {
                execute_concurrently(nodes, parent, parent_type, path, run).await
            }
            PlanNode::Parallel(nodes) | PlanNode::Sequence(nodes) => {
                let mut fragment = Map::new();
                for node in nodes {
                    let value =
                        execute_node(node, parent.clone(), parent_type, path.clone(), run).await;
                    merge(&mut fragment, value);
                }
                Value::Object(fragment)
            }
            PlanNode::Field { field, children } => {
                execute_field(field, Some(&**children), &parent, parent_type, path, run).await
            }
            PlanNode::Leaf { field } => {
                execute_field(field, None, &parent, parent_type, path, run).await
            }
            PlanNode::TypeCondition { type_name, node }
                if run.schema.is_possible_type(type_name, parent_type) =>
            {
                execute_node(node, parent, parent_type, path, run).await
            }
            PlanNode::Conditional {
                condition: true,
                node,
            } => execute_node(node, parent, parent_type, path, run).await,
            PlanNode::TypeCondition { .. } | PlanNode::Conditional { .. } => {
                Value::Object(Map::new())
            }
        }
    })
}

/// Spawns each sibling on its own task and joins them all, so no field of the
/// group is still resolving when this returns.
async fn execute_concurrently(
    nodes: &[PlanNode],
    parent: Value,
    parent_type: &str,
    path: Vec<PathSegment>,
    run: &Run,
) -> Value {
    let tasks: Vec<_> = nodes
        .iter()
        .map(|node| {
            let node = node.clone();
            let parent = parent.clone();
            let parent_type = parent_type.to_owned();
            let path = path.clone();
            let run = run.clone();
            tokio::spawn(async move { execute_node(&node, parent, &parent_type, path, &run).await })
        })
        .collect();

    let mut fragment = Map::new();
    for task in tasks {
        match task.await {
            Ok(value) => merge(&mut fragment, value),
            Err(e) => {
                let error = FieldError::new(format!("field task failed: {e}"));
                run.fail(error.with_path(path.clone())).await;
            }
        }
    }
    Value::Object(fragment)
}

fn merge(fragment: &mut Map<String, Value>, value: Value) {
    if let Value::Object(entries) = value {
        fragment.extend(entries);
    }
}

/// Resolves one selected field and completes its value. Returns a single
/// entry object keyed by the field's response key.
async fn execute_field(
    field: &FieldSelection,
    children: Option<&PlanNode>,
    parent: &Value,
    parent_type: &str,
    mut path: Vec<PathSegment>,
    run: &Run,
) -> Value {
    let key = field.response_key().to_owned();
    path.push(PathSegment::from(key.as_str()));

    let value = if field.is_typename() {
        Value::from(parent_type)
    } else if path.len() > run.config.max_depth {
        let message = format!("query exceeds the maximum depth of {}", run.config.max_depth);
        run.fail(FieldError::new(message).with_path(path)).await;
        Value::Null
    } else if let Some(def) = run.schema.field(parent_type, &field.name) {
        resolve_field(field, def, children, parent, parent_type, path, run).await
    } else {
        let message = format!("type `{parent_type}` has no field `{}`", field.name);
        run.fail(FieldError::new(message).with_path(path)).await;
        Value::Null
    };

    let mut entry = Map::with_capacity(1);
    entry.insert(key, value);
    Value::Object(entry)
}

/// Calls the field's resolver and completes its value between the listeners'
/// field hooks. The hooks see an error when either step nulled the field.
async fn resolve_field(
    field: &FieldSelection,
    def: &FieldDef,
    children: Option<&PlanNode>,
    parent: &Value,
    parent_type: &str,
    path: Vec<PathSegment>,
    run: &Run,
) -> Value {
    let args: ResolverArgs = field.arguments.iter().cloned().collect();
    let mut info = ResolverInfo::new(&field.name, parent_type)
        .with_return_type(def.ty.clone())
        .with_path(path);

    let mut extensions = Extensions::new();
    let on_resolved: Vec<DidResolveField> = run
        .listeners
        .iter()
        .filter_map(|listener| listener.will_resolve_field(&info, &mut extensions))
        .collect();
    info.extensions = extensions;

    let resolved = run
        .resolvers
        .get(parent_type, &field.name)
        .resolve(parent, &args, &run.request, &info)
        .await;

    let (value, outcome) = match resolved {
        Ok(value) => {
            let completed = match children {
                Some(children) => {
                    complete_value(&def.ty, value, children, info.path.clone(), run).await
                }
                None => Completed::value(value),
            };
            let outcome = completed.failure.map_or(Ok(()), |message| {
                Err(ResolverError::Completion(message))
            });
            (completed.value, outcome)
        }
        Err(error) => {
            trace!(path = %DisplayPath(&info.path), %error, "resolver failed");
            run.fail(FieldError::from(error.clone()).with_path(info.path.clone()))
                .await;
            (Value::Null, Err(error))
        }
    };

    for callback in on_resolved {
        callback(outcome.as_ref().map(|_| &value));
    }
    value
}

/// A completed value, and the first completion error that nulled it or one
/// of its list items.
struct Completed {
    value: Value,
    failure: Option<String>,
}

impl Completed {
    fn value(value: Value) -> Self {
        Self {
            value,
            failure: None,
        }
    }
}

/// Completes `value` against `ty`, executing `children` on every object it
/// contains. Errors of nested fields are their own; only values this field
/// cannot produce count as its failure.
fn complete_value<'a>(
    ty: &'a TypeRef,
    value: Value,
    children: &'a PlanNode,
    path: Vec<PathSegment>,
    run: &'a Run,
) -> BoxFuture<'a, Completed> {
    Box::pin(async move {
        match (ty, value) {
            (_, Value::Null) => Completed::value(Value::Null),
            (TypeRef::List(inner), Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                let mut failure = None;
                for (index, item) in items.into_iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(PathSegment::Index(index));
                    let item = complete_value(inner, item, children, item_path, run).await;
                    failure = failure.or(item.failure);
                    values.push(item.value);
                }
                Completed {
                    value: Value::Array(values),
                    failure,
                }
            }
            (TypeRef::Option(inner) | TypeRef::List(inner), value) => {
                complete_value(inner, value, children, path, run).await
            }
            (TypeRef::Named(name), value) => complete_named(name, value, children, path, run).await,
        }
    })
}

async fn complete_named(
    name: &str,
    value: Value,
    children: &PlanNode,
    path: Vec<PathSegment>,
    run: &Run,
) -> Completed {
    let concrete = match run.schema.get_type(name) {
        Some(TypeDef::Object(_)) => name.to_owned(),
        Some(TypeDef::Interface(_) | TypeDef::Union(_)) => {
            match value.get("__typename").and_then(Value::as_str) {
                Some(concrete) => concrete.to_owned(),
                None => {
                    let message = format!("value of abstract type `{name}` has no `__typename`");
                    run.fail(FieldError::new(message.clone()).with_path(path)).await;
                    return Completed {
                        value: Value::Null,
                        failure: Some(message),
                    };
                }
            }
        }
        _ => return Completed::value(value),
    };
    Completed::value(execute_node(children, value, &concrete, path, run).await)
}
