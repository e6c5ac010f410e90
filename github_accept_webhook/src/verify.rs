use hmac::Mac;

use crate::error::Rejection;
use crate::setup::Secret;
use crate::signature::{ClaimedSignature, SIGNATURE_PREFIX};

/// Checks that `body` was signed with `secret`.
///
/// `signature_header` is the raw `X-Hub-Signature-256` value if the request had one. Empty bodies
/// are always refused, even when the signature over zero bytes is correct.
pub fn verify(
    body: &[u8],
    signature_header: Option<&[u8]>,
    secret: &Secret,
) -> Result<(), Rejection> {
    if body.is_empty() {
        return Err(Rejection::EmptyBody);
    }

    let claimed = ClaimedSignature::from_header(signature_header)?;

    let mut mac = secret.keyed();
    mac.update(body);

    // constant time comparison, also fails on a length mismatch
    mac.verify_slice(claimed.as_bytes())
        .map_err(|_| Rejection::Mismatch)
}

/// Computes the `X-Hub-Signature-256` value a sender holding `secret` would attach to `body`.
pub fn sign(body: &[u8], secret: &Secret) -> String {
    let mut mac = secret.keyed();
    mac.update(body);

    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}
