use std::collections::HashMap;
use std::fmt::Debug;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Errors raised while building a middleware from its configuration.
///
/// These are fatal, a pipeline that fails setup never serves a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("empty secret")]
    EmptySecret,
    #[error("secret can't be used as a HMAC key")]
    InvalidKey,
    #[error("missing argument '{0}'")]
    MissingArgument(&'static str),
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

/// The shared webhook secret, already turned into a keyed HMAC-SHA256 state.
///
/// Cloning the keyed state per request is cheaper than re-keying and means the raw bytes are only
/// touched once, at setup.
#[derive(Clone)]
pub struct Secret {
    mac: HmacSha256,
}

impl Secret {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SetupError> {
        let secret = secret.as_ref();

        if secret.is_empty() {
            return Err(SetupError::EmptySecret);
        }

        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SetupError::InvalidKey)?;

        Ok(Secret { mac })
    }

    /// Fresh MAC state keyed with this secret.
    pub(crate) fn keyed(&self) -> HmacSha256 {
        self.mac.clone()
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

pub(crate) const SECRET_ARGUMENT: &str = "secret";

/// Pulls the secret out of a step's arguments, rejecting anything else.
pub(crate) fn secret_from_arguments(
    arguments: &HashMap<String, String>,
) -> Result<Secret, SetupError> {
    if let Some(unknown) = arguments.keys().find(|key| *key != SECRET_ARGUMENT) {
        return Err(SetupError::UnknownArgument(unknown.clone()));
    }

    let secret = arguments
        .get(SECRET_ARGUMENT)
        .ok_or(SetupError::MissingArgument(SECRET_ARGUMENT))?;

    Secret::new(secret)
}
