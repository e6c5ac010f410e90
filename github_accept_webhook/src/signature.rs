use std::fmt::Debug;

use thiserror::Error;

use crate::error::Rejection;

/// Header GitHub puts the body signature in.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_PREFIX: &str = "sha256=";
/// Length in bytes of a HMAC-SHA256 tag.
pub const SIGNATURE_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedSignature {
    #[error("missing 'sha256=' prefix")]
    MissingPrefix,
    #[error("hex-decoding signature: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// The signature a client claims for its request body, decoded from the header value.
#[derive(Clone, PartialEq, Eq)]
pub struct ClaimedSignature([u8; SIGNATURE_LEN]);

impl ClaimedSignature {
    /// Parses a raw `X-Hub-Signature-256` value, `None` meaning the header wasn't sent.
    pub fn from_header(value: Option<&[u8]>) -> Result<Self, Rejection> {
        let value = match value {
            Some(value) if !value.is_empty() => value,
            _ => return Err(Rejection::MissingSignature),
        };

        let encoded = value
            .strip_prefix(SIGNATURE_PREFIX.as_bytes())
            .ok_or(MalformedSignature::MissingPrefix)?;
        if encoded.is_empty() {
            return Err(Rejection::MissingSignature);
        }

        Ok(Self::decode(encoded)?)
    }

    /// Decodes the hex part of the header, which has to be exactly [`SIGNATURE_LEN`] bytes.
    pub fn decode(encoded: impl AsRef<[u8]>) -> Result<Self, MalformedSignature> {
        let mut signature = [0; SIGNATURE_LEN];
        hex::decode_to_slice(encoded, &mut signature)?;

        Ok(ClaimedSignature(signature))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for ClaimedSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClaimedSignature({})", hex::encode(self.0))
    }
}
