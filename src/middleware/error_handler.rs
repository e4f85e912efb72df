use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

const LOGGED_BODY_LIMIT: usize = 1024;

/// 记录所有 5xx 响应的状态和响应体前缀，原响应体原样返回
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!(%method, %uri, "Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let logged = &bytes[..bytes.len().min(LOGGED_BODY_LIMIT)];
    error!(
        %method,
        %uri,
        truncated = bytes.len() > LOGGED_BODY_LIMIT,
        "Server error occurred - Status: {}, Body: {}",
        parts.status,
        String::from_utf8_lossy(logged)
    );

    Response::from_parts(parts, Body::from(bytes))
}
