use std::collections::HashMap;

use async_trait::async_trait;
use http::{HeaderValue, Request};
use http_body_util::BodyExt;
use shared::body::{full, WebhookBody};
use shared::http::RemoteAddr;
use shared::{Middleware, MiddlewareResult};
use tracing::{debug, error};

pub use crate::error::Rejection;
pub use crate::setup::{Secret, SetupError};
pub use crate::signature::{ClaimedSignature, MalformedSignature, SIGNATURE_HEADER};
pub use crate::verify::{sign, verify};

pub mod error;
pub mod setup;
pub mod signature;
pub mod verify;

/// Middleware that only lets requests through whose body carries a valid GitHub
/// `X-Hub-Signature-256` signature.
#[derive(Debug, Clone)]
pub struct GithubAcceptWebhook {
    secret: Secret,
}

impl GithubAcceptWebhook {
    pub const ID: &'static str = "validate_github";

    pub fn new(secret: Secret) -> Self {
        GithubAcceptWebhook { secret }
    }

    /// Builds the middleware from the `arguments` of a pipeline step. The only (and required)
    /// argument is `secret`.
    pub fn setup(arguments: &HashMap<String, String>) -> Result<Self, SetupError> {
        Ok(Self::new(setup::secret_from_arguments(arguments)?))
    }

    /// Reads the whole body, verifies it and hands back the request with a fresh body carrying the
    /// same bytes.
    pub async fn accept(
        &self,
        request: Request<WebhookBody>,
    ) -> Result<Request<WebhookBody>, Rejection> {
        let (parts, body) = request.into_parts();

        let body = body.collect().await.map_err(Rejection::ReadBody)?.to_bytes();

        verify(
            &body,
            parts.headers.get(SIGNATURE_HEADER).map(HeaderValue::as_bytes),
            &self.secret,
        )?;

        Ok(Request::from_parts(parts, full(body)))
    }
}

#[async_trait]
impl Middleware for GithubAcceptWebhook {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn handle(&self, request: Request<WebhookBody>) -> MiddlewareResult {
        let remote = request
            .extensions()
            .get::<RemoteAddr>()
            .map(|RemoteAddr(addr)| addr.to_string());

        match self.accept(request).await {
            Ok(request) => {
                debug!(remote = ?remote, "successful webhook invocation");

                MiddlewareResult::Continue(request)
            }
            Err(rejection @ Rejection::ReadBody(_)) => {
                error!(remote = ?remote, "{}", rejection);

                MiddlewareResult::Reject
            }
            Err(rejection) => {
                debug!(remote = ?remote, "rejected webhook: {}", rejection);

                MiddlewareResult::Reject
            }
        }
    }
}
