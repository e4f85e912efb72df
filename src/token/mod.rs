//! Stateless HS256 session tokens.
//!
//! A token is `base64url(header).base64url(payload).base64url(signature)`
//! where the signature is HMAC-SHA256 over the first two segments. Nothing
//! is stored server side: validity is the signature plus the `exp` claim.

mod clock;
mod codec;
mod issuer;
mod verifier;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::FixedClock;
pub use codec::TokenCodec;
pub use issuer::{IssuedToken, TokenIssuer};
pub use verifier::TokenVerifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i64,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expires at, unix seconds
    pub exp: i64,
}

impl Claims {
    pub fn lifetime_secs(&self) -> i64 {
        self.exp.saturating_sub(self.iat)
    }
}

/// Why a token was refused. Callers outside the auth layer only ever see
/// "invalid"; the variants exist for logs.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(&'static str),
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,
    #[error("token crypto failure: {0}")]
    Crypto(#[from] jsonwebtoken::errors::Error),
}
