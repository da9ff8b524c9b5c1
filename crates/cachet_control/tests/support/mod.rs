//! Shared fixtures for the cache control integration tests.

#![allow(dead_code)]

use cachet_control::{
    augment_schema, directive, CacheControlConfig, CacheControlPlugin, CacheHint,
    CachePolicyOverride, Hint, EXTENSION_KEY,
};
use cachet_runtime::{
    Context, DisplayPath, Executor, FieldDef, InterfaceDef, ObjectDef, PathSegment, QueryPlan,
    ResolverMap, Response, Schema, SchemaBuilder, TypeDef, TypeRef, UnionDef,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Installs a test log writer once; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small Star Wars schema.
///
/// `hints` attaches `@cacheControl` uses: a key like `"Droid"` targets a type,
/// a key like `"Query.droid"` targets a field definition.
pub fn star_wars_schema(hints: &[(&str, CacheHint)]) -> Schema {
    let character_fields = || {
        [
            FieldDef::new("id", TypeRef::named("ID")),
            FieldDef::new("name", TypeRef::named("String")),
            FieldDef::new("friends", TypeRef::list(TypeRef::named("Character"))),
        ]
    };

    let mut character = InterfaceDef::new("Character");
    let mut droid = ObjectDef::new("Droid")
        .implements("Character")
        .field(FieldDef::new("primaryFunction", TypeRef::named("String")));
    let mut human = ObjectDef::new("Human")
        .implements("Character")
        .field(FieldDef::new("homePlanet", TypeRef::named("String")));
    for field in character_fields() {
        character = character.field(field.clone());
        droid = droid.field(field.clone());
        human = human.field(field);
    }

    let mut schema = augment_schema(SchemaBuilder::new())
        .query_type("Query")
        .object(
            ObjectDef::new("Query")
                .field(
                    FieldDef::new("droid", TypeRef::option(TypeRef::named("Droid")))
                        .argument("id", TypeRef::named("ID")),
                )
                .field(FieldDef::new("droids", TypeRef::list(TypeRef::named("Droid"))))
                .field(FieldDef::new("hero", TypeRef::named("Character")))
                .field(FieldDef::new(
                    "search",
                    TypeRef::list(TypeRef::named("SearchResult")),
                ))
                .field(FieldDef::new("hello", TypeRef::named("String")))
                .field(FieldDef::new("now", TypeRef::named("String"))),
        )
        .interface(character)
        .object(droid)
        .object(human)
        .union(UnionDef::new("SearchResult", ["Droid", "Human"]))
        .build();

    for (target, hint) in hints {
        let use_site = directive(*hint);
        match target.split_once('.') {
            Some((type_name, field_name)) => {
                let field = schema
                    .types
                    .get_mut(type_name)
                    .and_then(|t| match t {
                        TypeDef::Object(o) => o.fields.get_mut(field_name),
                        TypeDef::Interface(i) => i.fields.get_mut(field_name),
                        _ => None,
                    })
                    .unwrap_or_else(|| panic!("no field {target}"));
                field.directives.push(use_site);
            }
            None => match schema.types.get_mut(*target) {
                Some(TypeDef::Object(o)) => o.directives.push(use_site),
                Some(TypeDef::Interface(i)) => i.directives.push(use_site),
                Some(TypeDef::Union(u)) => u.directives.push(use_site),
                _ => panic!("no type {target}"),
            },
        }
    }

    schema
}

fn r2d2() -> Value {
    json!({
        "__typename": "Droid",
        "id": "2001",
        "name": "R2-D2",
        "primaryFunction": "Astromech",
        "friends": [
            {"__typename": "Human", "id": "1000", "name": "Luke Skywalker"},
            {"__typename": "Droid", "id": "2000", "name": "C-3PO"}
        ]
    })
}

fn c3po() -> Value {
    json!({
        "__typename": "Droid",
        "id": "2000",
        "name": "C-3PO",
        "primaryFunction": "Protocol",
        "friends": [
            {"__typename": "Droid", "id": "2001", "name": "R2-D2"}
        ]
    })
}

fn luke() -> Value {
    json!({
        "__typename": "Human",
        "id": "1000",
        "name": "Luke Skywalker",
        "homePlanet": "Tatooine",
        "friends": []
    })
}

/// Resolvers for [`star_wars_schema`]. Nested fields use the default
/// resolver.
pub fn star_wars_resolvers() -> ResolverMap {
    let mut resolvers = ResolverMap::new();
    resolvers.register_fn("Query", "droid", |_parent, args, _ctx, _info| {
        let id: String = args.require("id")?;
        Ok(match id.as_str() {
            "2001" => r2d2(),
            "2000" => c3po(),
            _ => Value::Null,
        })
    });
    resolvers.register_async("Query", "droids", |_parent, _args, _ctx, _info| async {
        tokio::task::yield_now().await;
        Ok(json!([r2d2(), c3po()]))
    });
    resolvers.register_fn("Query", "hero", |_parent, _args, _ctx, _info| Ok(r2d2()));
    resolvers.register_fn("Query", "search", |_parent, _args, _ctx, _info| {
        Ok(json!([r2d2(), luke()]))
    });
    resolvers.register_fn("Query", "hello", |_parent, _args, _ctx, _info| {
        Ok(json!("world"))
    });
    resolvers.register_fn("Query", "now", |_parent, _args, _ctx, _info| {
        Ok(json!("2026-10-19T00:00:00Z"))
    });
    resolvers
}

/// Runs `plan` through an executor with the cache control plugin installed
/// and returns the finished response.
pub async fn plugin_test_harness(
    schema: Schema,
    resolvers: ResolverMap,
    plan: &QueryPlan,
    config: CacheControlConfig,
    policy_override: Option<CacheHint>,
) -> Response {
    init_tracing();
    let plugin = CacheControlPlugin::new(&schema, config).expect("valid cache control schema");
    let executor = Executor::new(Arc::new(schema), resolvers).with_plugin(Arc::new(plugin));

    let mut ctx = Context::new();
    if let Some(hint) = policy_override {
        ctx = ctx.with_extension(CachePolicyOverride(hint));
    }
    executor.execute(plan, &ctx).await
}

/// Reads the exposed hints of a response, ordered by path.
pub fn hints_of(response: &Response) -> Vec<Hint> {
    let hints = response.extensions[EXTENSION_KEY]["hints"].clone();
    sorted(serde_json::from_value(hints).expect("hints in the response extension"))
}

/// Runs `plan` with raw hints exposed and returns them, ordered by path.
/// Fails on responses with errors.
pub async fn collect_cache_control_hints(
    schema: Schema,
    resolvers: ResolverMap,
    plan: &QueryPlan,
    config: CacheControlConfig,
) -> Vec<Hint> {
    let response =
        plugin_test_harness(schema, resolvers, plan, config.with_raw_hints(true), None).await;
    assert!(!response.has_errors(), "unexpected errors: {:?}", response.errors);
    hints_of(&response)
}

/// Builds an expected hint from a dotted path such as `"droids.0.friends"`.
pub fn hint(path: &str, hint: CacheHint) -> Hint {
    let path = path
        .split('.')
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::from(segment),
        })
        .collect();
    Hint::new(path, hint)
}

/// Orders hints by their dotted path.
pub fn sorted(mut hints: Vec<Hint>) -> Vec<Hint> {
    hints.sort_by_key(|h| DisplayPath(&h.path).to_string());
    hints
}
