//! Storing responses according to their cache policy.

use crate::hint::CacheScope;
use crate::plugin::CacheControlOutcome;
use cachet_runtime::{KeyValueCache, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Stores `response` under `key` if its cache policy allows shared caching.
///
/// The response must carry a [`CacheControlOutcome`] with an overall policy
/// whose `maxAge` is positive and whose scope is not `PRIVATE`, and must have
/// no errors. The entry expires after `maxAge` seconds. Returns whether the
/// response was stored.
pub async fn persist_response(cache: &dyn KeyValueCache, key: &str, response: &Response) -> bool {
    let Some(policy) = CacheControlOutcome::of(response).and_then(|o| o.overall_cache_policy) else {
        debug!(key, "not caching response without a cache policy");
        return false;
    };
    if !policy.is_cacheable() || policy.scope == Some(CacheScope::Private) || response.has_errors() {
        debug!(key, max_age = policy.max_age, scope = ?policy.scope, "response is not cacheable");
        return false;
    }

    match serde_json::to_string(response) {
        Ok(body) => {
            let ttl = Duration::from_secs(u64::from(policy.max_age));
            cache.set(key, body, Some(ttl)).await;
            debug!(key, max_age = policy.max_age, "cached response");
            true
        }
        Err(e) => {
            warn!(key, error = %e, "failed to serialize response for caching");
            false
        }
    }
}

/// Reads a response stored by [`persist_response`].
pub async fn lookup_response(cache: &dyn KeyValueCache, key: &str) -> Option<Response> {
    let body = cache.get(key).await?;
    match serde_json::from_str(&body) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!(key, error = %e, "discarding unreadable cached response");
            None
        }
    }
}
