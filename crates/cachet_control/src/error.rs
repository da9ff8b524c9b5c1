//! Error types for cache control.

use crate::collector::CollectorState;
use cachet_runtime::ResolverError;
use serde_json::Value;
use thiserror::Error;

/// Result type for cache control operations.
pub type CacheControlResult<T> = Result<T, CacheControlError>;

/// Errors raised while declaring, setting or collecting cache hints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheControlError {
    #[error("maxAge on {location} must be a non-negative integer, got {value}")]
    InvalidMaxAge { location: String, value: Value },

    #[error("scope on {location} must be PUBLIC or PRIVATE, got {value}")]
    InvalidScope { location: String, value: Value },

    #[error("unknown argument `{name}` to @cacheControl on {location}")]
    UnknownArgument { location: String, name: String },

    #[error("@cacheControl is not allowed on {location}")]
    MisplacedDirective { location: String },

    #[error("@cacheControl is repeated on {location}")]
    RepeatedDirective { location: String },

    #[error("dynamic cache hint for {path} was set after the field finished resolving")]
    HintConsumed { path: String },

    #[error("cannot record a cache hint for {path} while the collector is {state}")]
    CollectorNotCollecting { path: String, state: CollectorState },

    #[error("cannot move the hint collector from {from} to {to}")]
    InvalidTransition {
        from: CollectorState,
        to: CollectorState,
    },
}

impl From<CacheControlError> for ResolverError {
    fn from(error: CacheControlError) -> Self {
        ResolverError::Custom(error.to_string())
    }
}
