use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Decides whether a last-seen write is due for an account. Implementations
/// record the decision, so a `true` answer is given at most once per window.
#[async_trait]
pub trait ActivityThrottle: Send + Sync {
    async fn should_record(&self, account_id: i64, now: i64) -> bool;
}

/// Per-process throttle. State is lost on restart, which only means one
/// extra last-seen write per account.
pub struct MemoryActivityThrottle {
    window_secs: i64,
    last_recorded: DashMap<i64, i64>,
}

impl MemoryActivityThrottle {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs: i64::try_from(window_secs).unwrap_or(i64::MAX),
            last_recorded: DashMap::new(),
        }
    }
}

#[async_trait]
impl ActivityThrottle for MemoryActivityThrottle {
    async fn should_record(&self, account_id: i64, now: i64) -> bool {
        match self.last_recorded.entry(account_id) {
            Entry::Occupied(mut last) => {
                if now.saturating_sub(*last.get()) >= self.window_secs {
                    last.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }
}

/// Prefix of the per-account last-seen throttle keys.
const LAST_SEEN_PREFIX: &str = "last_seen:";

fn last_seen_key(account_id: i64) -> String {
    format!("{}{}", LAST_SEEN_PREFIX, account_id)
}

/// Throttle shared by every process through Redis `SET NX EX`.
pub struct RedisActivityThrottle {
    redis: Arc<redis::Client>,
    window_secs: u64,
}

impl RedisActivityThrottle {
    pub fn new(redis: Arc<redis::Client>, window_secs: u64) -> Self {
        Self { redis, window_secs }
    }
}

#[async_trait]
impl ActivityThrottle for RedisActivityThrottle {
    async fn should_record(&self, account_id: i64, now: i64) -> bool {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Redis unavailable for activity throttle: {}", e);
                return false;
            }
        };

        let set: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(last_seen_key(account_id))
            .arg(now)
            .arg("NX")
            .arg("EX")
            .arg(self.window_secs)
            .query_async(&mut conn)
            .await;

        match set {
            Ok(reply) => reply.is_some(),
            Err(e) => {
                tracing::warn!("Activity throttle SET failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_once_per_window_per_account() {
        let throttle = MemoryActivityThrottle::new(300);

        assert!(throttle.should_record(1, 1_000).await);
        assert!(!throttle.should_record(1, 1_001).await);
        assert!(!throttle.should_record(1, 1_299).await);
        assert!(throttle.should_record(1, 1_300).await);
        assert!(!throttle.should_record(1, 1_301).await);
    }

    #[tokio::test]
    async fn accounts_are_throttled_independently() {
        let throttle = MemoryActivityThrottle::new(300);

        assert!(throttle.should_record(1, 1_000).await);
        assert!(throttle.should_record(2, 1_000).await);
        assert!(!throttle.should_record(2, 1_100).await);
    }

    #[tokio::test]
    async fn huge_window_records_only_once() {
        let throttle = MemoryActivityThrottle::new(u64::MAX);

        assert!(throttle.should_record(1, 0).await);
        assert!(!throttle.should_record(1, i64::MAX - 1).await);
    }

    #[test]
    fn redis_key_is_namespaced() {
        assert_eq!(last_seen_key(42), "last_seen:42");
    }
}
