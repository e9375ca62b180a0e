//! Credential signing for exchange WebSocket handshakes.
//!
//! Exchanges that authenticate the socket (Upbit) expect a short-lived
//! HS256 JWT in the `Authorization: Bearer` header. The claim set carries the
//! access key and a random nonce, so every dial must sign a fresh token.
//!
//! The token is assembled by hand from HMAC-SHA256 and base64url:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(hmac_sha256(secret, header.claims))
//! ```

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::{RelayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// JOSE header shared by every token.
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Exchange API key pair. Read-only after config load.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Build a key pair, rejecting a secret that cannot sign.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();
        if secret_key.is_empty() {
            return Err(RelayError::Auth(format!("empty secret key for access key '{access_key}'")));
        }
        Ok(Self { access_key, secret_key })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

// Keeps the secret out of logs and `{:?}` dumps of the config.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    access_key: &'a str,
    nonce: String,
}

/// Compute an HMAC-SHA256 digest of `message` keyed by `secret`.
pub fn hmac_sha256(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| RelayError::Auth(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Sign a fresh bearer token for `creds`.
///
/// Each call draws a new UUID v4 nonce, so two tokens for the same key pair
/// never repeat.
pub fn sign_token(creds: &Credentials) -> Result<String> {
    if creds.secret_key.is_empty() {
        return Err(RelayError::Auth("empty secret key".into()));
    }

    let claims = Claims { access_key: &creds.access_key, nonce: uuid::Uuid::new_v4().to_string() };
    let claims_json = serde_json::to_vec(&claims).map_err(|e| RelayError::Auth(e.to_string()))?;

    let signing_input =
        format!("{}.{}", URL_SAFE_NO_PAD.encode(JWT_HEADER), URL_SAFE_NO_PAD.encode(claims_json));
    let signature = hmac_sha256(creds.secret_key.as_bytes(), signing_input.as_bytes())?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}
