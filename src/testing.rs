//! In-memory stand-ins shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::accounts::{Account, AccountStore, NewAccount, StoreError, hash_password};

pub const TEST_PASSWORD: &str = "sabertooth-42";

#[derive(Default)]
pub struct MemoryAccountStore {
    next_id: AtomicI64,
    accounts: DashMap<i64, Account>,
    touches: DashMap<i64, usize>,
}

impl MemoryAccountStore {
    /// Inserts a verified account whose password is [`TEST_PASSWORD`].
    pub fn insert_verified(&self, username: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.accounts.insert(
            id,
            Account {
                id,
                username: username.to_owned(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(TEST_PASSWORD, 4).unwrap(),
                is_banned: false,
                email_verified: true,
                is_admin: false,
                created_at: chrono::Utc::now(),
                last_seen_at: None,
            },
        );
        id
    }

    pub fn update(&self, id: i64, change: impl FnOnce(&mut Account)) {
        let mut account = self.accounts.get_mut(&id).unwrap();
        change(&mut account);
    }

    pub fn touches(&self, id: i64) -> usize {
        self.touches.get(&id).map(|n| *n).unwrap_or(0)
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| {
                a.username.eq_ignore_ascii_case(login) || a.email.eq_ignore_ascii_case(login)
            })
            .map(|a| a.value().clone()))
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let taken = self.accounts.iter().any(|a| {
            a.username.eq_ignore_ascii_case(&new.username)
                || a.email.eq_ignore_ascii_case(&new.email)
        });
        if taken {
            return Err(StoreError::Duplicate);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_banned: false,
            email_verified: false,
            is_admin: false,
            created_at: chrono::Utc::now(),
            last_seen_at: None,
        };
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn touch_last_seen(&self, id: i64) -> Result<(), StoreError> {
        *self.touches.entry(id).or_insert(0) += 1;
        if let Some(mut account) = self.accounts.get_mut(&id) {
            account.last_seen_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}
