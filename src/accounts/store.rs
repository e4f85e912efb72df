use async_trait::async_trait;
use sqlx::PgPool;

use super::{Account, NewAccount};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username or email already taken")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Access to the `users` table. The session layer only reads through it,
/// apart from the best-effort last-seen touch.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    /// Looks an account up by username or email.
    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError>;

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn touch_last_seen(&self, id: i64) -> Result<(), StoreError>;
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, is_banned, email_verified, \
                               is_admin, created_at, last_seen_at";

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users \
             WHERE lower(username) = lower($1) OR lower(email) = lower($1)"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let result = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => {
                tracing::info!(account_id = created.id, "created account");
                Ok(created)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate),
            Err(e) => {
                tracing::error!("Failed to create account: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn touch_last_seen(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
