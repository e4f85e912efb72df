use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError};

/// 解析会话并把 `AuthSession` 放入请求扩展，失败直接返回错误响应
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // 嵌套路由下 uri 已去掉前缀，豁免列表使用完整路径
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let session = state.sessions.resolve(req.headers(), &path).await?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
