use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Config;
use crate::token::IssuedToken;

/// Http-only, same-site cookie carrying a freshly issued token. `Secure` is
/// set everywhere except debug mode.
pub fn session_cookie(config: &Config, issued: &IssuedToken) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.debug)
        .max_age(time::Duration::seconds(issued.claims.lifetime_secs()))
        .build()
}

pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.debug)
        .build();
    cookie.make_removal();
    cookie
}
