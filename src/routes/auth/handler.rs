use std::time::Duration;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;

use super::model::{
    CheckTokenResponse, LoginRequest, RegisterRequest, SessionResponse, TokenResponse,
};
use crate::{
    AppState,
    accounts::{Account, NewAccount, hash_password, verify_password},
    error::{AppError, AuthError},
    session::{AuthSession, removal_cookie, session_cookie},
};

/// bcrypt 计算量较大，放到阻塞线程池执行
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!("Password task panicked: {}", e);
        AppError::Internal
    })?
    .map_err(AppError::from)
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    account: Account,
    lifetime: Duration,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let issued = state.issuer.issue(account.id, lifetime)?;
    let jar = jar.add(session_cookie(&state.config, &issued));

    Ok((
        jar,
        Json(SessionResponse {
            account,
            expires_at: issued.claims.exp,
            token: issued.token,
        }),
    ))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    req.validate()?;

    let cost = state.config.bcrypt_cost;
    let password = req.password;
    let password_hash = blocking(move || hash_password(&password, cost)).await?;

    let account = state
        .accounts
        .create(NewAccount {
            username: req.username.trim().to_owned(),
            email: req.email.trim().to_owned(),
            password_hash,
        })
        .await?;

    let lifetime = state.config.session_lifetime();
    let (jar, body) = start_session(&state, jar, account, lifetime)?;
    Ok((StatusCode::CREATED, jar, body))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    // 用户不存在时也校验一次诱饵哈希，两种失败的耗时和错误都相同
    let account = state.accounts.find_by_login(req.login.trim()).await?;
    let hash = match &account {
        Some(account) => account.password_hash.clone(),
        None => state.login_decoy_hash.to_string(),
    };
    let password = req.password;
    let password_ok = blocking(move || verify_password(&password, &hash)).await?;

    let Some(account) = account else {
        return Err(AppError::InvalidCredentials);
    };
    if !password_ok {
        tracing::info!(account_id = account.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    if account.is_banned {
        return Err(AuthError::AccountBanned.into());
    }

    let lifetime = if req.remember {
        state.config.remember_lifetime()
    } else {
        state.config.session_lifetime()
    };
    start_session(&state, jar, account, lifetime)
}

/// Drops the session cookie. The token itself stays valid until it expires.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.add(removal_cookie(&state.config)))
}

#[axum::debug_handler]
pub async fn me(Extension(session): Extension<AuthSession>) -> Json<Account> {
    Json(session.account)
}

/// 使用与当前令牌相同的有效期签发新令牌
#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let lifetime = Duration::from_secs(session.claims.lifetime_secs().max(0) as u64);
    let issued = state.issuer.issue(session.account.id, lifetime)?;
    let jar = jar.add(session_cookie(&state.config, &issued));

    Ok((
        jar,
        Json(TokenResponse {
            expires_at: issued.claims.exp,
            token: issued.token,
        }),
    ))
}

#[axum::debug_handler]
pub async fn check_token(Extension(session): Extension<AuthSession>) -> Json<CheckTokenResponse> {
    Json(CheckTokenResponse {
        account_id: session.account.id,
        expires_at: session.claims.exp,
    })
}
