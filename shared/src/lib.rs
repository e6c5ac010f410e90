use std::fmt::Debug;

use async_trait::async_trait;
use ::http::Request;

use crate::body::WebhookBody;

pub mod body;
pub mod http;

/// What a middleware decided about a request.
///
/// `Continue` hands the (possibly rebuilt) request to the next stage, `Reject` ends the pipeline.
pub enum MiddlewareResult {
    Continue(Request<WebhookBody>),
    Reject,
}

impl Debug for MiddlewareResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue(request) => f
                .debug_tuple("Continue")
                .field(request.method())
                .field(request.uri())
                .finish(),
            Self::Reject => write!(f, "Reject"),
        }
    }
}

/// A request authenticator that can be placed in a route pipeline.
///
/// Implementations own everything they need (secrets etc.) after construction and must not mutate
/// it per request, the same instance is shared between all connections.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in the config file to reference this middleware.
    fn id(&self) -> &'static str;

    async fn handle(&self, request: Request<WebhookBody>) -> MiddlewareResult;
}
