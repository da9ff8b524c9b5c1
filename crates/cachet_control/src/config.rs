//! Plugin configuration.

use serde::{Deserialize, Serialize};

/// Cache control plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheControlConfig {
    /// `maxAge` given to root leaf fields that declare none.
    #[serde(default)]
    pub default_max_age: u32,

    /// Whether to compute the overall policy of each response.
    #[serde(default = "default_true")]
    pub calculate_overall_cache_policy: bool,

    /// Whether to include the recorded hints in the response extension.
    #[serde(default)]
    pub expose_raw_hints: bool,

    /// Whether to set a `Cache-Control` header on cacheable responses.
    #[serde(default = "default_true")]
    pub calculate_http_headers: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            default_max_age: 0,
            calculate_overall_cache_policy: true,
            expose_raw_hints: false,
            calculate_http_headers: true,
        }
    }
}

impl CacheControlConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default `maxAge`.
    pub fn with_default_max_age(mut self, seconds: u32) -> Self {
        self.default_max_age = seconds;
        self
    }

    /// Enables or disables the overall policy.
    pub fn with_overall_cache_policy(mut self, enabled: bool) -> Self {
        self.calculate_overall_cache_policy = enabled;
        self
    }

    /// Enables or disables exposing the recorded hints.
    pub fn with_raw_hints(mut self, enabled: bool) -> Self {
        self.expose_raw_hints = enabled;
        self
    }

    /// Enables or disables the `Cache-Control` header.
    pub fn with_http_headers(mut self, enabled: bool) -> Self {
        self.calculate_http_headers = enabled;
        self
    }
}
