use shared::body::BoxError;
use thiserror::Error;

use crate::signature::MalformedSignature;

/// Why a request was refused.
///
/// Only ever logged, every variant results in the same response for the client so the response
/// can't be used to find out which check failed.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("reading request body: {0}")]
    ReadBody(#[source] BoxError),
    #[error("cannot validate an empty request body")]
    EmptyBody,
    #[error("missing X-Hub-Signature-256 header in request")]
    MissingSignature,
    #[error(transparent)]
    MalformedSignature(#[from] MalformedSignature),
    #[error("signature doesn't match the request body")]
    Mismatch,
}
