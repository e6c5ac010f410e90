use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type flowing through the middleware pipeline.
///
/// The server boxes the incoming stream into this, middlewares that consume the stream put a
/// [`full`] body back in.
pub type WebhookBody = UnsyncBoxBody<Bytes, BoxError>;

/// A body that yields `bytes` once and then ends.
pub fn full(bytes: impl Into<Bytes>) -> WebhookBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

