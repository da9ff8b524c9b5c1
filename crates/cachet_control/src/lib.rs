//! GraphQL cache control for cachet.
//!
//! Collects a cache hint for every resolved field and folds them into one
//! overall policy per response:
//! - `hint`: Hints, scopes and policies
//! - `declarations`: Static `@cacheControl` declarations
//! - `source`: Effective hint of a field, dynamic overrides
//! - `collector`: Per-request hint collection
//! - `aggregate`: Overall policy computation
//! - `plugin`: Request lifecycle integration
//! - `persist`: Response caching by policy
//!
//! # Example
//!
//! ```no_run
//! use cachet_control::{augment_schema, CacheControlConfig, CacheControlPlugin};
//! use cachet_runtime::{Executor, ResolverMap, SchemaBuilder};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), cachet_control::CacheControlError> {
//! let schema = augment_schema(SchemaBuilder::new()).build();
//! let plugin = CacheControlPlugin::new(&schema, CacheControlConfig::default())?;
//! let executor = Executor::new(Arc::new(schema), ResolverMap::new()).with_plugin(Arc::new(plugin));
//! # let _ = executor;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod declarations;
pub mod error;
pub mod hint;
pub mod persist;
pub mod plugin;
pub mod source;

pub use aggregate::{reduce, reduce_hints};
pub use collector::{CollectorState, HintCollector};
pub use config::CacheControlConfig;
pub use declarations::{
    augment_schema, cache_control_directive, directive, HintDeclarations,
    CACHE_CONTROL_DIRECTIVE, CACHE_CONTROL_SCOPE_ENUM,
};
pub use error::{CacheControlError, CacheControlResult};
pub use hint::{CacheHint, CachePolicyOverride, CacheScope, Hint, OverallCachePolicy};
pub use persist::{lookup_response, persist_response};
pub use plugin::{
    CacheControlListener, CacheControlOutcome, CacheControlPlugin, CACHE_CONTROL_HEADER,
    EXTENSION_KEY, EXTENSION_VERSION,
};
pub use source::{effective_hint, CacheControlExt, DynamicHint, FieldSite, ReturnKind};
