//! Per-session visit counters

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::AppResult;

use super::redis::RedisService;

/// Visit counter keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Count one more visit; the first visit of a session returns 1
    async fn record_visit(&self, session_id: &str) -> AppResult<u64>;
}

struct Visits {
    count: u64,
    last_seen: Instant,
}

/// Counters kept in process memory, lost on restart.
///
/// A session idle for longer than the ttl starts over, and idle sessions are
/// dropped whenever a new one is opened.
pub struct MemorySessionStore {
    ttl: Duration,
    visits: Mutex<HashMap<String, Visits>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            visits: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.visits.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn record_visit(&self, session_id: &str) -> AppResult<u64> {
        let now = Instant::now();
        let mut visits = self.visits.lock().await;

        if !visits.contains_key(session_id) {
            visits.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        }

        let entry = visits.entry(session_id.to_string()).or_insert(Visits {
            count: 0,
            last_seen: now,
        });
        if now.duration_since(entry.last_seen) >= self.ttl {
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        entry.last_seen = now;
        Ok(entry.count)
    }
}

/// Counters kept in Redis under `session:<id>:visits`
pub struct RedisSessionStore {
    redis: RedisService,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(redis: RedisService, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn record_visit(&self, session_id: &str) -> AppResult<u64> {
        let key = format!("session:{}:visits", session_id);
        self.redis.incr_with_expiry(&key, self.ttl_seconds).await
    }
}
