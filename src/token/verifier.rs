use std::sync::Arc;

use super::{Claims, Clock, TokenCodec, TokenError};

pub struct TokenVerifier {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// A token is accepted while `now < exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.codec.decode_signed(token)?;
        if self.clock.now() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
