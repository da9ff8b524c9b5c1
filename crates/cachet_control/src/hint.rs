//! Cache hints and policies.

use crate::error::{CacheControlError, CacheControlResult};
use cachet_runtime::PathSegment;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Visibility class of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheScope {
    /// Safe to store in shared caches.
    Public,
    /// Per-requester caches only.
    Private,
}

impl CacheScope {
    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }

    /// Parses a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PUBLIC" => Some(Self::Public),
            "PRIVATE" => Some(Self::Private),
            _ => None,
        }
    }

    /// Returns the more restrictive of two scopes.
    pub fn restrict(self, other: CacheScope) -> CacheScope {
        if self == Self::Private || other == Self::Private {
            Self::Private
        } else {
            Self::Public
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cacheability statement. Either axis may be unset, meaning "no opinion".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHint {
    /// Maximum age in seconds; `0` means never cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<CacheScope>,
}

impl CacheHint {
    /// A hint with no opinion on either axis.
    pub const NONE: CacheHint = CacheHint {
        max_age: None,
        scope: None,
    };

    /// Creates a hint with only a maximum age.
    pub const fn max_age(seconds: u32) -> Self {
        Self {
            max_age: Some(seconds),
            scope: None,
        }
    }

    /// Creates a hint with only a scope.
    pub const fn scope(scope: CacheScope) -> Self {
        Self {
            max_age: None,
            scope: Some(scope),
        }
    }

    /// Sets the maximum age.
    pub const fn with_max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Sets the scope.
    pub const fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Returns true if neither axis is set.
    pub const fn is_empty(&self) -> bool {
        self.max_age.is_none() && self.scope.is_none()
    }

    /// Fills the axes `self` leaves unset from `lower`.
    pub fn or(self, lower: CacheHint) -> CacheHint {
        CacheHint {
            max_age: self.max_age.or(lower.max_age),
            scope: self.scope.or(lower.scope),
        }
    }

    /// Reads a hint from `@cacheControl` style arguments.
    ///
    /// `location` names the schema element or field the arguments belong to
    /// and is only used in error messages.
    pub fn from_arguments(
        arguments: &IndexMap<String, Value>,
        location: &str,
    ) -> CacheControlResult<Self> {
        let mut hint = CacheHint::NONE;
        for (name, value) in arguments {
            match name.as_str() {
                "maxAge" => hint.max_age = parse_max_age(value, location)?,
                "scope" => hint.scope = parse_scope(value, location)?,
                _ => {
                    return Err(CacheControlError::UnknownArgument {
                        location: location.to_string(),
                        name: name.clone(),
                    })
                }
            }
        }
        Ok(hint)
    }
}

fn parse_max_age(value: &Value, location: &str) -> CacheControlResult<Option<u32>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .and_then(|seconds| u32::try_from(seconds).ok())
        .map(Some)
        .ok_or_else(|| CacheControlError::InvalidMaxAge {
            location: location.to_string(),
            value: value.clone(),
        })
}

fn parse_scope(value: &Value, location: &str) -> CacheControlResult<Option<CacheScope>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_str()
        .and_then(CacheScope::parse)
        .map(Some)
        .ok_or_else(|| CacheControlError::InvalidScope {
            location: location.to_string(),
            value: value.clone(),
        })
}

/// A hint recorded for one resolved field instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// Response path of the field.
    pub path: Vec<PathSegment>,
    #[serde(flatten)]
    pub hint: CacheHint,
}

impl Hint {
    /// Creates a recorded hint.
    pub fn new(path: Vec<PathSegment>, hint: CacheHint) -> Self {
        Self { path, hint }
    }
}

/// The cacheability of a whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallCachePolicy {
    pub max_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<CacheScope>,
}

impl OverallCachePolicy {
    /// Returns true if the response may be cached at all.
    pub const fn is_cacheable(&self) -> bool {
        self.max_age > 0
    }

    /// Renders a `Cache-Control` header value, or `None` when the response
    /// must not be cached.
    pub fn http_header_value(&self) -> Option<String> {
        if !self.is_cacheable() {
            return None;
        }
        Some(match self.scope {
            Some(scope) => format!(
                "max-age={}, {}",
                self.max_age,
                scope.as_str().to_ascii_lowercase()
            ),
            None => format!("max-age={}", self.max_age),
        })
    }
}

/// A caller-supplied overall policy for one request.
///
/// Insert it into the request [`Context`](cachet_runtime::Context) extensions;
/// each axis it sets replaces the aggregated value for that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicyOverride(pub CacheHint);
