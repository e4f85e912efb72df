use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes::auth,
};

/// Builds the API router. Login and registration are rate limited when a
/// limiter is supplied.
pub fn create_router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    let credential_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));
    let credential_routes = match rate_limiter {
        Some(limiter) => credential_routes.route_layer(from_fn_with_state(limiter, rate_limit)),
        None => credential_routes,
    };

    let public_routes = Router::new()
        .merge(credential_routes)
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/refresh-token", post(auth::refresh_token))
        .route("/auth/check-token", get(auth::check_token))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new().merge(public_routes).merge(protected_routes);
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    router.layer(from_fn(log_errors)).with_state(state)
}
