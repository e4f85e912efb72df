use std::env;
use std::time::Duration;

/// Lifetime of an ordinary session token.
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 24 * 3600;
/// Lifetime of a "remember me" session token.
pub const DEFAULT_REMEMBER_LIFETIME_SECS: u64 = 7 * 24 * 3600;
/// Upper bound accepted for either configured token lifetime.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub session_lifetime_secs: u64,
    pub remember_lifetime_secs: u64,
    pub session_cookie_name: String,
    pub debug: bool,
    pub last_seen_throttle_secs: u64,
    pub last_seen_backend: ActivityBackend,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub bcrypt_cost: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: String::new(),
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
            remember_lifetime_secs: DEFAULT_REMEMBER_LIFETIME_SECS,
            session_cookie_name: "auth_token".into(),
            debug: false,
            last_seen_throttle_secs: 300,
            last_seen_backend: ActivityBackend::Memory,
            rate_limit_window_secs: 60,
            rate_limit_requests: 20,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
        }
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Zero or anything above [`MAX_TOKEN_LIFETIME_SECS`] falls back to `default`.
fn bounded_lifetime(secs: u64, default: u64) -> u64 {
    if (1..=MAX_TOKEN_LIFETIME_SECS).contains(&secs) {
        secs
    } else {
        tracing::warn!(secs, default, "token lifetime out of range, using default");
        default
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let last_seen_backend = match env::var("LAST_SEEN_BACKEND").as_deref() {
            Ok("redis") => ActivityBackend::Redis,
            _ => ActivityBackend::Memory,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            session_lifetime_secs: bounded_lifetime(
                parsed_or("SESSION_LIFETIME", defaults.session_lifetime_secs),
                defaults.session_lifetime_secs,
            ),
            remember_lifetime_secs: bounded_lifetime(
                parsed_or("REMEMBER_LIFETIME", defaults.remember_lifetime_secs),
                defaults.remember_lifetime_secs,
            ),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),
            debug: parsed_or("APP_DEBUG", defaults.debug),
            last_seen_throttle_secs: parsed_or(
                "LAST_SEEN_THROTTLE",
                defaults.last_seen_throttle_secs,
            ),
            last_seen_backend,
            rate_limit_window_secs: parsed_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            bcrypt_cost: parsed_or("BCRYPT_COST", defaults.bcrypt_cost),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed_or("SERVER_PORT", defaults.server_port),
            api_base_uri: env::var("API_BASE_URI").unwrap_or(defaults.api_base_uri),
        })
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    pub fn remember_lifetime(&self) -> Duration {
        Duration::from_secs(self.remember_lifetime_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Full request paths that an account with an unverified email may still reach.
    pub fn verification_exempt_paths(&self) -> Vec<String> {
        let base = self.api_base_uri.trim_end_matches('/');
        ["/auth/me", "/auth/check-token", "/auth/logout"]
            .iter()
            .map(|p| format!("{base}{p}"))
            .collect()
    }
}
