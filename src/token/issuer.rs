use std::sync::Arc;
use std::time::Duration;

use super::{Claims, Clock, TokenCodec, TokenError};

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

pub struct TokenIssuer {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    pub fn issue(&self, subject: i64, lifetime: Duration) -> Result<IssuedToken, TokenError> {
        let iat = self.clock.now();
        let exp = i64::try_from(lifetime.as_secs())
            .ok()
            .and_then(|secs| iat.checked_add(secs))
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let claims = Claims {
            sub: subject,
            iat,
            exp,
        };
        let token = self.codec.encode(&claims)?;
        tracing::debug!(subject, exp = claims.exp, "issued session token");

        Ok(IssuedToken { token, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::FixedClock;

    #[test]
    fn payload_spans_requested_lifetime() {
        let issuer = TokenIssuer::new(
            TokenCodec::new(b"issuer-secret"),
            Arc::new(FixedClock::new(1_000)),
        );

        let issued = issuer.issue(3, Duration::from_secs(604_800)).unwrap();

        assert_eq!(issued.claims.sub, 3);
        assert_eq!(issued.claims.iat, 1_000);
        assert_eq!(issued.claims.lifetime_secs(), 604_800);
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn oversized_lifetime_is_refused_instead_of_wrapping() {
        let issuer = TokenIssuer::new(
            TokenCodec::new(b"issuer-secret"),
            Arc::new(FixedClock::new(1_000)),
        );

        for secs in [u64::MAX, i64::MAX as u64] {
            assert!(matches!(
                issuer.issue(1, Duration::from_secs(secs)),
                Err(TokenError::LifetimeOutOfRange)
            ));
        }

        let largest = (i64::MAX - 1_000) as u64;
        assert_eq!(
            issuer.issue(1, Duration::from_secs(largest)).unwrap().claims.exp,
            i64::MAX
        );
    }
}
