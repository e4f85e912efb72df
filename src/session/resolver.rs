use std::collections::HashSet;
use std::sync::Arc;

use axum::http::HeaderMap;

use super::{ActivityThrottle, extract_token};
use crate::accounts::{Account, AccountStore};
use crate::error::{AppError, AuthError};
use crate::token::{Claims, Clock, TokenVerifier};

/// An authenticated request: the live account record and the claims of the
/// token it presented.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account: Account,
    pub claims: Claims,
}

pub struct SessionResolver {
    verifier: TokenVerifier,
    accounts: Arc<dyn AccountStore>,
    throttle: Arc<dyn ActivityThrottle>,
    clock: Arc<dyn Clock>,
    cookie_name: String,
    verification_exempt: HashSet<String>,
}

impl SessionResolver {
    pub fn new(
        verifier: TokenVerifier,
        accounts: Arc<dyn AccountStore>,
        throttle: Arc<dyn ActivityThrottle>,
        clock: Arc<dyn Clock>,
        cookie_name: String,
        verification_exempt: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            verifier,
            accounts,
            throttle,
            clock,
            cookie_name,
            verification_exempt: verification_exempt.into_iter().collect(),
        }
    }

    /// Authenticates a request to `path`. Every error is final for the
    /// request; only a storage failure is reported as something other than
    /// an [`AuthError`].
    pub async fn resolve(&self, headers: &HeaderMap, path: &str) -> Result<AuthSession, AppError> {
        let Some(token) = extract_token(headers, &self.cookie_name) else {
            return Err(AuthError::NotAuthenticated.into());
        };

        let claims = self.verifier.verify(&token).map_err(|e| {
            tracing::debug!(reason = %e, "rejected session token");
            AuthError::InvalidToken
        })?;

        let Some(account) = self.accounts.find_by_id(claims.sub).await? else {
            tracing::debug!(account_id = claims.sub, "token subject no longer exists");
            return Err(AuthError::NotAuthenticated.into());
        };

        if account.is_banned {
            tracing::warn!(account_id = account.id, "banned account presented a valid token");
            return Err(AuthError::AccountBanned.into());
        }

        if !account.email_verified && !self.verification_exempt.contains(path) {
            return Err(AuthError::EmailNotVerified.into());
        }

        self.record_activity(account.id).await;

        Ok(AuthSession { account, claims })
    }

    async fn record_activity(&self, account_id: i64) {
        if !self
            .throttle
            .should_record(account_id, self.clock.now())
            .await
        {
            return;
        }

        if let Err(e) = self.accounts.touch_last_seen(account_id).await {
            tracing::warn!(account_id, "Failed to update last seen: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{HeaderValue, header};

    use super::*;
    use crate::session::MemoryActivityThrottle;
    use crate::testing::MemoryAccountStore;
    use crate::token::{FixedClock, TokenCodec, TokenIssuer};

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        accounts: Arc<MemoryAccountStore>,
        clock: Arc<FixedClock>,
        issuer: TokenIssuer,
        resolver: SessionResolver,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(MemoryAccountStore::default());
        let clock = Arc::new(FixedClock::new(NOW));
        let codec = TokenCodec::new(b"resolver-secret");
        let resolver = SessionResolver::new(
            TokenVerifier::new(codec.clone(), clock.clone()),
            accounts.clone(),
            Arc::new(MemoryActivityThrottle::new(300)),
            clock.clone(),
            "auth_token".into(),
            ["/api/auth/me".to_string()],
        );
        Fixture {
            accounts,
            issuer: TokenIssuer::new(codec, clock.clone()),
            clock,
            resolver,
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn auth_error(result: Result<AuthSession, AppError>) -> AuthError {
        match result {
            Err(AppError::Auth(e)) => e,
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_credentials_is_not_authenticated() {
        let f = fixture();
        let result = f.resolver.resolve(&HeaderMap::new(), "/api/auth/refresh-token").await;
        assert_eq!(auth_error(result), AuthError::NotAuthenticated);
    }

    #[tokio::test]
    async fn valid_token_resolves_account() {
        let f = fixture();
        let id = f.accounts.insert_verified("rex");
        let token = f.issuer.issue(id, Duration::from_secs(86_400)).unwrap().token;

        let session = f.resolver.resolve(&bearer(&token), "/api/tribes").await.unwrap();

        assert_eq!(session.account.id, id);
        assert_eq!(session.claims.sub, id);
    }

    #[tokio::test]
    async fn cookie_token_resolves_account() {
        let f = fixture();
        let id = f.accounts.insert_verified("rex");
        let token = f.issuer.issue(id, Duration::from_secs(60)).unwrap().token;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("auth_token={token}")).unwrap(),
        );

        assert!(f.resolver.resolve(&headers, "/api/tribes").await.is_ok());
    }

    #[tokio::test]
    async fn garbage_and_expired_tokens_are_invalid() {
        let f = fixture();
        let id = f.accounts.insert_verified("rex");
        let token = f.issuer.issue(id, Duration::from_secs(60)).unwrap().token;

        let garbage = f.resolver.resolve(&bearer("x.y"), "/api/tribes").await;
        assert_eq!(auth_error(garbage), AuthError::InvalidToken);

        f.clock.advance(60);
        let expired = f.resolver.resolve(&bearer(&token), "/api/tribes").await;
        assert_eq!(auth_error(expired), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn missing_account_is_not_authenticated() {
        let f = fixture();
        let token = f.issuer.issue(999, Duration::from_secs(60)).unwrap().token;
        let result = f.resolver.resolve(&bearer(&token), "/api/tribes").await;
        assert_eq!(auth_error(result), AuthError::NotAuthenticated);
    }

    #[tokio::test]
    async fn banned_account_is_forbidden_not_unauthorized() {
        let f = fixture();
        let id = f.accounts.insert_verified("raider");
        let token = f.issuer.issue(id, Duration::from_secs(86_400)).unwrap().token;
        f.accounts.update(id, |a| a.is_banned = true);

        let err = auth_error(f.resolver.resolve(&bearer(&token), "/api/auth/me").await);

        assert_eq!(err, AuthError::AccountBanned);
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unverified_email_only_reaches_exempt_paths() {
        let f = fixture();
        let id = f.accounts.insert_verified("newbie");
        f.accounts.update(id, |a| a.email_verified = false);
        let token = f.issuer.issue(id, Duration::from_secs(60)).unwrap().token;

        let blocked = f.resolver.resolve(&bearer(&token), "/api/tribes").await;
        assert_eq!(auth_error(blocked), AuthError::EmailNotVerified);

        assert!(f.resolver.resolve(&bearer(&token), "/api/auth/me").await.is_ok());
    }

    #[tokio::test]
    async fn last_seen_is_throttled() {
        let f = fixture();
        let id = f.accounts.insert_verified("rex");
        let token = f.issuer.issue(id, Duration::from_secs(86_400)).unwrap().token;

        for _ in 0..3 {
            f.resolver.resolve(&bearer(&token), "/api/tribes").await.unwrap();
        }
        assert_eq!(f.accounts.touches(id), 1);

        f.clock.advance(300);
        f.resolver.resolve(&bearer(&token), "/api/tribes").await.unwrap();
        assert_eq!(f.accounts.touches(id), 2);
    }
}
