//! Request lifecycle integration.
//!
//! [`CacheControlPlugin`] hands every request a [`CacheControlListener`] that
//! records the effective hint of each resolved field and, once execution has
//! drained, writes the overall policy into the response.

use crate::aggregate;
use crate::collector::HintCollector;
use crate::config::CacheControlConfig;
use crate::declarations::HintDeclarations;
use crate::error::CacheControlResult;
use crate::hint::{CachePolicyOverride, Hint, OverallCachePolicy};
use crate::source::{self, DynamicHint};
use async_trait::async_trait;
use cachet_runtime::{
    Context, DidResolveField, DisplayPath, ExecutionError, Extensions, Plugin, RequestListener,
    ResolverError, ResolverInfo, Response, ResponseContext, Schema,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Response extension key.
pub const EXTENSION_KEY: &str = "cacheControl";

/// Version of the response extension format.
pub const EXTENSION_VERSION: u32 = 1;

/// HTTP header carrying the overall policy.
pub const CACHE_CONTROL_HEADER: &str = "Cache-Control";

/// What cache control concluded about one response.
///
/// Stored in [`Response::metadata`] for layers running after the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheControlOutcome {
    /// The overall policy, unless disabled or execution failed.
    pub overall_cache_policy: Option<OverallCachePolicy>,
    /// Every recorded hint.
    pub hints: Vec<Hint>,
    /// Whether every resolved leaf field carried a `maxAge`.
    pub all_leaves_had_max_age: bool,
}

impl CacheControlOutcome {
    /// Returns the outcome attached to `response`, if any.
    pub fn of(response: &Response) -> Option<&Self> {
        response.metadata.get::<Self>()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheControlExtension<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    overall_cache_policy: Option<OverallCachePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hints: Option<&'a [Hint]>,
}

/// The cache control plugin.
pub struct CacheControlPlugin {
    config: CacheControlConfig,
    declarations: Arc<HintDeclarations>,
}

impl CacheControlPlugin {
    /// Creates the plugin for `schema`, reading its `@cacheControl`
    /// declarations.
    pub fn new(schema: &Schema, config: CacheControlConfig) -> CacheControlResult<Self> {
        let declarations = HintDeclarations::from_schema(schema)?;
        Ok(Self {
            config,
            declarations: Arc::new(declarations),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheControlConfig {
        &self.config
    }

    /// Returns the extracted declarations.
    pub fn declarations(&self) -> &HintDeclarations {
        &self.declarations
    }
}

impl Plugin for CacheControlPlugin {
    fn request_did_start(&self, _ctx: &Context) -> Option<Arc<dyn RequestListener>> {
        Some(Arc::new(CacheControlListener::new(
            self.config.clone(),
            Arc::clone(&self.declarations),
        )))
    }
}

/// Per-request half of [`CacheControlPlugin`].
pub struct CacheControlListener {
    config: CacheControlConfig,
    declarations: Arc<HintDeclarations>,
    collector: Arc<HintCollector>,
    execution_failed: AtomicBool,
}

impl CacheControlListener {
    /// Creates a listener with an empty collector.
    pub fn new(config: CacheControlConfig, declarations: Arc<HintDeclarations>) -> Self {
        Self {
            config,
            declarations,
            collector: Arc::new(HintCollector::new()),
            execution_failed: AtomicBool::new(false),
        }
    }

    /// Returns the request's collector.
    pub fn collector(&self) -> &HintCollector {
        &self.collector
    }
}

#[async_trait]
impl RequestListener for CacheControlListener {
    async fn execution_did_start(&self) {
        if let Err(e) = self.collector.start() {
            warn!(error = %e, "cache control collector did not start");
        }
    }

    fn will_resolve_field(
        &self,
        info: &ResolverInfo,
        extensions: &mut Extensions,
    ) -> Option<DidResolveField> {
        let dynamic = DynamicHint::new(&info.path);
        extensions.insert(dynamic.clone());

        let site = self.declarations.site(info);
        let collector = Arc::clone(&self.collector);
        let default_max_age = self.config.default_max_age;
        let path = info.path.clone();

        Some(Box::new(move |result: Result<&Value, &ResolverError>| {
            let dynamic = dynamic.consume();
            if let Err(error) = result {
                trace!(path = %DisplayPath(&path), %error, "no cache hint for failed field");
                return;
            }

            let hint = source::effective_hint(&site, dynamic, default_max_age);
            trace!(
                path = %DisplayPath(&path),
                max_age = ?hint.and_then(|h| h.max_age),
                scope = ?hint.and_then(|h| h.scope),
                "resolved cache hint"
            );
            if let Err(e) = collector.record(path, hint, site.is_leaf()) {
                warn!(error = %e, "dropping cache hint");
            }
        }))
    }

    async fn execution_did_end(&self, error: Option<&ExecutionError>) {
        if let Some(error) = error {
            debug!(%error, "execution failed; no cache policy will be computed");
            self.execution_failed.store(true, Ordering::SeqCst);
        }
        if let Err(e) = self.collector.close() {
            warn!(error = %e, "cache control collector did not close");
        }
    }

    async fn will_send_response(&self, ctx: &mut ResponseContext<'_>) {
        let hints = match self.collector.finalize() {
            Ok(hints) => hints,
            Err(e) => {
                warn!(error = %e, "cache control already finalized this response");
                return;
            }
        };
        let failed = self.execution_failed.load(Ordering::SeqCst);

        let overall_cache_policy = (self.config.calculate_overall_cache_policy && !failed)
            .then(|| {
                let policy_override = ctx
                    .context
                    .extension::<CachePolicyOverride>()
                    .map(|o| o.0)
                    .unwrap_or_default();
                aggregate::reduce_hints(&hints, policy_override, self.config.default_max_age)
            });
        let all_leaves_had_max_age = self.collector.all_leaves_had_max_age();

        debug!(
            hints = hints.len(),
            max_age = ?overall_cache_policy.map(|p| p.max_age),
            scope = ?overall_cache_policy.and_then(|p| p.scope),
            all_leaves_had_max_age,
            "computed cache policy"
        );

        let response = &mut *ctx.response;
        if !failed && (overall_cache_policy.is_some() || self.config.expose_raw_hints) {
            let extension = CacheControlExtension {
                version: EXTENSION_VERSION,
                overall_cache_policy,
                hints: self.config.expose_raw_hints.then_some(hints.as_slice()),
            };
            match serde_json::to_value(&extension) {
                Ok(value) => {
                    response.extensions.insert(EXTENSION_KEY.to_string(), value);
                }
                Err(e) => warn!(error = %e, "failed to serialize cache control extension"),
            }
        }

        if self.config.calculate_http_headers && !response.has_errors() {
            if let Some(value) = overall_cache_policy.and_then(|p| p.http_header_value()) {
                response
                    .http_headers
                    .insert(CACHE_CONTROL_HEADER.to_string(), value);
            }
        }

        response.metadata.insert(CacheControlOutcome {
            overall_cache_policy,
            hints,
            all_leaves_had_max_age,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{augment_schema, directive};
    use crate::hint::{CacheHint, CacheScope};
    use cachet_runtime::{FieldDef, ObjectDef, OperationKind, PathSegment, SchemaBuilder, TypeRef};
    use serde_json::json;

    fn plugin(config: CacheControlConfig) -> CacheControlPlugin {
        let schema = augment_schema(SchemaBuilder::new())
            .query_type("Query")
            .object(
                ObjectDef::new("Query").field(
                    FieldDef::new("hello", TypeRef::named("String"))
                        .directive(directive(CacheHint::max_age(30))),
                ),
            )
            .build();
        CacheControlPlugin::new(&schema, config).unwrap()
    }

    fn hello_info() -> ResolverInfo {
        ResolverInfo::new("hello", "Query")
            .with_return_type(TypeRef::named("String"))
            .with_path(vec![PathSegment::from("hello")])
    }

    #[tokio::test]
    async fn test_late_hint_is_dropped() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let ctx = Context::new();
        let listener = plugin(CacheControlConfig::default())
            .request_did_start(&ctx)
            .unwrap();

        listener.execution_did_start().await;
        let done = listener
            .will_resolve_field(&hello_info(), &mut Extensions::new())
            .unwrap();
        listener.execution_did_end(None).await;
        done(Ok(&json!("late")));

        let mut response = Response::data(json!({"hello": "late"}));
        listener
            .will_send_response(&mut ResponseContext {
                response: &mut response,
                context: &ctx,
            })
            .await;

        let outcome = CacheControlOutcome::of(&response).unwrap();
        assert!(outcome.hints.is_empty());
        assert_eq!(
            outcome.overall_cache_policy,
            Some(OverallCachePolicy {
                max_age: 0,
                scope: None
            })
        );
    }

    #[tokio::test]
    async fn test_response_is_written_once() {
        let ctx = Context::new().with_extension(CachePolicyOverride(
            CacheHint::max_age(10).with_scope(CacheScope::Public),
        ));
        let listener = plugin(CacheControlConfig::default())
            .request_did_start(&ctx)
            .unwrap();
        listener.execution_did_start().await;
        listener.execution_did_end(None).await;

        let mut response = Response::data(json!({}));
        let mut send = ResponseContext {
            response: &mut response,
            context: &ctx,
        };
        listener.will_send_response(&mut send).await;
        send.response.extensions.clear();
        listener.will_send_response(&mut send).await;

        assert!(response.extensions.is_empty());
        assert_eq!(
            response.http_headers.get(CACHE_CONTROL_HEADER).map(String::as_str),
            Some("max-age=10, public")
        );
    }

    #[tokio::test]
    async fn test_execution_failure_emits_no_policy() {
        let ctx = Context::new();
        let listener = plugin(CacheControlConfig::default())
            .request_did_start(&ctx)
            .unwrap();
        listener.execution_did_start().await;
        listener
            .execution_did_end(Some(&ExecutionError::MissingRootType(
                OperationKind::Mutation,
            )))
            .await;

        let mut response = Response::default();
        listener
            .will_send_response(&mut ResponseContext {
                response: &mut response,
                context: &ctx,
            })
            .await;

        assert!(!response.extensions.contains_key(EXTENSION_KEY));
        assert!(response.http_headers.is_empty());
        assert_eq!(
            CacheControlOutcome::of(&response).unwrap().overall_cache_policy,
            None
        );
    }

    #[test]
    fn test_dynamic_hint_is_installed() {
        let listener = CacheControlListener::new(
            CacheControlConfig::default(),
            Arc::new(HintDeclarations::default()),
        );
        let mut extensions = Extensions::new();
        let _done = listener.will_resolve_field(&hello_info(), &mut extensions);

        assert!(extensions.contains::<DynamicHint>());
    }
}
