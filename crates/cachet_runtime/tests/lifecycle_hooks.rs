//! Integration tests for the request lifecycle hooks.

use async_trait::async_trait;
use cachet_runtime::{
    Context, DidResolveField, ExecutionError, Executor, Extensions, FieldDef, InterfaceDef,
    ObjectDef, PlanNode, Plugin, QueryPlan, RequestListener, ResolverError, ResolverInfo,
    ResolverMap, ResponseContext, SchemaBuilder, TypeRef,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq)]
struct Greeting(&'static str);

#[derive(Default)]
struct Recorder {
    started: AtomicBool,
    resolved: AtomicUsize,
    failed: AtomicUsize,
    resolved_at_end: Mutex<Option<usize>>,
    seen_paths: Mutex<Vec<String>>,
}

struct RecordingListener(Arc<Recorder>);

#[async_trait]
impl RequestListener for RecordingListener {
    async fn execution_did_start(&self) {
        self.0.started.store(true, Ordering::SeqCst);
    }

    fn will_resolve_field(
        &self,
        info: &ResolverInfo,
        extensions: &mut Extensions,
    ) -> Option<DidResolveField> {
        extensions.insert(Greeting("hello from the listener"));
        self.0
            .seen_paths
            .lock()
            .unwrap()
            .push(cachet_runtime::DisplayPath(&info.path).to_string());

        let recorder = Arc::clone(&self.0);
        Some(Box::new(move |result: Result<&Value, &ResolverError>| match result {
            Ok(_) => {
                recorder.resolved.fetch_add(1, Ordering::SeqCst);
            }
            Err(_) => {
                recorder.failed.fetch_add(1, Ordering::SeqCst);
            }
        }))
    }

    async fn execution_did_end(&self, error: Option<&ExecutionError>) {
        assert!(error.is_none());
        *self.0.resolved_at_end.lock().unwrap() = Some(
            self.0.resolved.load(Ordering::SeqCst) + self.0.failed.load(Ordering::SeqCst),
        );
    }

    async fn will_send_response(&self, ctx: &mut ResponseContext<'_>) {
        ctx.response
            .extensions
            .insert("recorded".to_string(), serde_json::json!(true));
    }
}

struct RecordingPlugin(Arc<Recorder>);

impl Plugin for RecordingPlugin {
    fn request_did_start(&self, _ctx: &Context) -> Option<Arc<dyn RequestListener>> {
        Some(Arc::new(RecordingListener(Arc::clone(&self.0))))
    }
}

fn executor(recorder: Arc<Recorder>) -> Executor {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .object(
            ObjectDef::new("Query")
                .field(FieldDef::new("greeting", TypeRef::named("String")))
                .field(FieldDef::new("broken", TypeRef::named("String")))
                .field(FieldDef::new(
                    "items",
                    TypeRef::list(TypeRef::named("Item")),
                ))
                .field(FieldDef::new("node", TypeRef::named("Node"))),
        )
        .object(
            ObjectDef::new("Item")
                .implements("Node")
                .field(FieldDef::new("id", TypeRef::named("ID"))),
        )
        .interface(InterfaceDef::new("Node").field(FieldDef::new("id", TypeRef::named("ID"))))
        .build();

    let mut resolvers = ResolverMap::new();
    resolvers.register_fn("Query", "greeting", |_parent, _args, _ctx, info| {
        let greeting = info
            .extensions
            .get::<Greeting>()
            .map(|g| g.0)
            .unwrap_or("missing");
        Ok(serde_json::json!(greeting))
    });
    resolvers.register_fn("Query", "broken", |_parent, _args, _ctx, _info| {
        Err(ResolverError::Custom("boom".to_string()))
    });
    resolvers.register_async("Query", "items", |_parent, _args, _ctx, _info| async {
        tokio::task::yield_now().await;
        Ok(serde_json::json!([{"id": "a"}, {"id": "b"}]))
    });

    resolvers.register_fn("Query", "node", |_parent, _args, _ctx, _info| {
        Ok(serde_json::json!({"id": "untyped"}))
    });

    Executor::new(Arc::new(schema), resolvers).with_plugin(Arc::new(RecordingPlugin(recorder)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hooks_fire_in_lifecycle_order() {
    let recorder = Arc::new(Recorder::default());
    let executor = executor(Arc::clone(&recorder));
    let plan = QueryPlan::query(vec![
        PlanNode::leaf("greeting"),
        PlanNode::leaf("broken"),
        PlanNode::object("items", vec![PlanNode::leaf("id")]),
    ]);

    let response = executor.execute(&plan, &Context::new()).await;

    assert!(recorder.started.load(Ordering::SeqCst));
    // greeting, broken, items, items.0.id, items.1.id
    assert_eq!(recorder.resolved.load(Ordering::SeqCst), 4);
    assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.resolved_at_end.lock().unwrap(), Some(5));

    let mut paths = recorder.seen_paths.lock().unwrap().clone();
    paths.sort();
    assert_eq!(
        paths,
        vec!["broken", "greeting", "items", "items.0.id", "items.1.id"]
    );

    let data = response.data.as_ref().unwrap();
    assert_eq!(data["greeting"], "hello from the listener");
    assert_eq!(response.extensions["recorded"], serde_json::json!(true));
    assert!(response.has_errors());
}

#[tokio::test]
async fn test_skipped_fields_do_not_fire_hooks() {
    let recorder = Arc::new(Recorder::default());
    let executor = executor(Arc::clone(&recorder));
    let plan = QueryPlan::query(vec![
        PlanNode::leaf("greeting"),
        PlanNode::include_if(false, PlanNode::leaf("broken")),
    ]);

    let response = executor.execute(&plan, &Context::new()).await;

    assert_eq!(recorder.resolved.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.failed.load(Ordering::SeqCst), 0);
    assert!(!response.has_errors());
}

#[tokio::test]
async fn test_completion_failure_reaches_field_callback() {
    let recorder = Arc::new(Recorder::default());
    let executor = executor(Arc::clone(&recorder));
    let plan = QueryPlan::query(vec![
        PlanNode::leaf("greeting"),
        PlanNode::object("node", vec![PlanNode::leaf("id")]),
    ]);

    let response = executor.execute(&plan, &Context::new()).await;

    assert_eq!(recorder.resolved.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);
    assert_eq!(response.data.as_ref().unwrap()["node"], Value::Null);
    assert!(response.errors[0].message.contains("__typename"));
}
