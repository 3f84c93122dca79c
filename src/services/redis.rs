//! Redis service for short-lived counters

use redis::Client;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service and check the server answers
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let service = Self { client };
        let mut conn = service.get_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(service)
    }

    /// Increment `key` and push its expiry `ttl_seconds` into the future.
    /// Returns the value after the increment (1 for a new key).
    pub async fn incr_with_expiry(&self, key: &str, ttl_seconds: u64) -> AppResult<u64> {
        let mut conn = self.get_connection().await?;

        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let (value,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .expire(key, ttl)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to increment {} in Redis: {}", key, e)))?;

        Ok(value)
    }

    /// Get a Redis connection
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}
