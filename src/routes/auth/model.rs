use serde::{Deserialize, Serialize};

use crate::accounts::Account;
use crate::error::AppError;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=128;
const EMAIL_MAX_LEN: usize = 254;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let username = self.username.trim();
        if !USERNAME_LEN.contains(&username.chars().count())
            || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(
                "Username must be 3-32 letters, digits or underscores".into(),
            ));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed || email.len() > EMAIL_MAX_LEN {
            return Err(AppError::Validation("Invalid email address".into()));
        }

        if !PASSWORD_LEN.contains(&self.password.chars().count()) {
            return Err(AppError::Validation(
                "Password must be between 8 and 128 characters".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: Account,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckTokenResponse {
    pub account_id: i64,
    pub expires_at: i64,
}
