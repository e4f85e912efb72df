use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, crypto};
use serde::de::DeserializeOwned;

use super::{Claims, TokenError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and opens compact tokens with a single server secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            claims,
            &self.encoding,
        )?)
    }

    /// Checks shape and signature and returns the payload. Expiry is not
    /// looked at here.
    pub fn decode_signed(&self, token: &str) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed("expected three segments"));
        };

        let parsed: Header = decode_segment(header)?;
        if parsed.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        // crypto::verify recomputes the HMAC and compares in constant time
        let signed = &token[..header.len() + 1 + payload.len()];
        if !crypto::verify(signature, signed.as_bytes(), &self.decoding, ALGORITHM)? {
            return Err(TokenError::BadSignature);
        }

        decode_segment(payload)
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed("segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed("segment is not valid json"))
}
