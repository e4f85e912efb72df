use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{config::Config, error::AppError};

/// Fixed-window request counter per client IP, kept in Redis.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Arc<Config>) -> Self {
        Self { redis, config }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, AppError> {
        // 从连接信息获取原始IP
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());
        let ip = client_ip(req.headers(), remote_ip.as_deref());

        let key = rate_limit_key(&ip);
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::error!("Redis connection failed in rate limiter: {}", e);
                AppError::Internal
            })?;

        // SET NX EX 与 INCR 在同一事务中执行，计数键创建时就带有过期时间
        let window = self.config.rate_limit_window().as_secs();
        let (count,): (u32,) = counter_pipeline(&key, window)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!("Rate limit counter failed: {}", e);
                AppError::Internal
            })?;

        if count > self.config.rate_limit_requests {
            tracing::warn!(%ip, count, "rate limit exceeded");
            return Err(AppError::RateLimited(window));
        }

        Ok(next.run(req).await)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    limiter.check_rate_limit(req, next).await
}

/// Creates the window key with its TTL if absent, then increments it, as one
/// MULTI/EXEC block. The reply is the new count.
fn counter_pipeline(key: &str, window_secs: u64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("EX")
        .arg(window_secs.max(1))
        .arg("NX")
        .ignore()
        .incr(key, 1);
    pipe
}

fn rate_limit_key(ip: &str) -> String {
    format!("rate_limit:auth:{}", ip)
}

/// 优先使用代理头中的IP，降级使用连接IP
fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip)
        .unwrap_or("unknown")
        .trim()
        .to_string()
}
