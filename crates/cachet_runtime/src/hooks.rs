//! Request lifecycle extension points.
//!
//! A [`Plugin`] is asked for a [`RequestListener`] when a request starts. The
//! executor then calls the listener at three points: before each field
//! resolves, once execution has drained, and once before the response is
//! handed back to the transport.

use crate::context::Context;
use crate::executor::ExecutionError;
use crate::extensions::Extensions;
use crate::resolver::{ResolverError, ResolverInfo};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked once the field announced by
/// [`RequestListener::will_resolve_field`] has resolved and its value has been
/// completed, before the value is placed into the response. It receives an
/// error if the resolver failed or completion nulled the value.
pub type DidResolveField = Box<dyn FnOnce(Result<&Value, &ResolverError>) + Send>;

/// Per-request lifecycle listener.
#[async_trait]
pub trait RequestListener: Send + Sync {
    /// Called once before the first field resolves.
    async fn execution_did_start(&self) {}

    /// Called once per field instance, before its resolver runs.
    ///
    /// Values inserted into `extensions` are visible to the resolver through
    /// [`ResolverInfo::extensions`].
    fn will_resolve_field(
        &self,
        _info: &ResolverInfo,
        _extensions: &mut Extensions,
    ) -> Option<DidResolveField> {
        None
    }

    /// Called once after every field of the request has finished resolving.
    async fn execution_did_end(&self, _error: Option<&ExecutionError>) {}

    /// Called once before the response is returned.
    async fn will_send_response(&self, _ctx: &mut ResponseContext<'_>) {}
}

/// A server-wide plugin producing one listener per request.
pub trait Plugin: Send + Sync {
    /// Starts a request, returning the listener for it if the plugin takes part.
    fn request_did_start(&self, ctx: &Context) -> Option<Arc<dyn RequestListener>>;
}

/// Access to the outgoing response during [`RequestListener::will_send_response`].
pub struct ResponseContext<'a> {
    /// The response about to be sent.
    pub response: &'a mut Response,
    /// The request context.
    pub context: &'a Context,
}
