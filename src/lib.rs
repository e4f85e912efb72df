use std::sync::Arc;

use accounts::{AccountStore, hash_password};
use config::Config;
use session::{ActivityThrottle, SessionResolver};
use token::{Clock, TokenCodec, TokenIssuer, TokenVerifier};

pub mod accounts;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod session;
pub mod token;

#[cfg(test)]
mod testing;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: Arc<dyn AccountStore>,
    pub issuer: Arc<TokenIssuer>,
    pub sessions: Arc<SessionResolver>,
    /// Hash checked when a login names no account, so both failures cost one bcrypt verify.
    pub login_decoy_hash: Arc<str>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        accounts: Arc<dyn AccountStore>,
        throttle: Arc<dyn ActivityThrottle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, bcrypt::BcryptError> {
        let login_decoy_hash = hash_password("no-such-account", config.bcrypt_cost)?;
        let codec = TokenCodec::new(config.jwt_secret.as_bytes());
        let sessions = SessionResolver::new(
            TokenVerifier::new(codec.clone(), clock.clone()),
            accounts.clone(),
            throttle,
            clock.clone(),
            config.session_cookie_name.clone(),
            config.verification_exempt_paths(),
        );

        Ok(Self {
            issuer: Arc::new(TokenIssuer::new(codec, clock)),
            sessions: Arc::new(sessions),
            login_decoy_hash: login_decoy_hash.into(),
            accounts,
            config,
        })
    }
}
