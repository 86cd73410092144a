//! Redis-backed disclosure view cache.

use async_trait::async_trait;
use carelink_application::{CacheLookup, CachedDisclosureView, DisclosureCache, DisclosureCacheKey};
use carelink_core::{AppError, AppResult};
use redis::AsyncCommands;

/// Seconds a generation counter outlives its last invalidation.
///
/// Must exceed the longest store read a cache-miss can wrap.
const GENERATION_TTL_SECONDS: i64 = 300;

/// Writes `ARGV[2]` to `KEYS[1]` only while `KEYS[2]` still holds generation `ARGV[1]`.
const SET_IF_GENERATION: &str = r"
local current = redis.call('GET', KEYS[2]) or '0'
if current ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
";

/// Redis implementation of the disclosure cache port.
#[derive(Clone)]
pub struct RedisDisclosureCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisDisclosureCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &DisclosureCacheKey) -> String {
        format!("{}:{}", self.key_prefix, key.storage_key())
    }

    fn generation_key_for(&self, key: &DisclosureCacheKey) -> String {
        format!("{}:gen:{}", self.key_prefix, key.storage_key())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Transient(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl DisclosureCache for RedisDisclosureCache {
    async fn get_view(&self, key: &DisclosureCacheKey) -> AppResult<CacheLookup> {
        let mut connection = self.connection().await?;

        let (encoded, generation): (Option<String>, Option<u64>) = connection
            .mget(&[self.key_for(key), self.generation_key_for(key)])
            .await
            .map_err(|error| {
                AppError::Transient(format!("failed to read disclosure cache entry: {error}"))
            })?;

        let view = encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<CachedDisclosureView>(value).map_err(|error| {
                    AppError::Internal(format!("invalid disclosure cache entry: {error}"))
                })
            })
            .transpose()?;

        Ok(CacheLookup {
            view,
            generation: generation.unwrap_or_default(),
        })
    }

    async fn set_view(
        &self,
        key: &DisclosureCacheKey,
        view: CachedDisclosureView,
        ttl_seconds: u32,
        generation: u64,
    ) -> AppResult<bool> {
        if ttl_seconds == 0 {
            return Ok(false);
        }

        let value = serde_json::to_string(&view).map_err(|error| {
            AppError::Internal(format!("failed to encode disclosure cache entry: {error}"))
        })?;
        let mut connection = self.connection().await?;

        let stored: i64 = redis::Script::new(SET_IF_GENERATION)
            .key(self.key_for(key))
            .key(self.generation_key_for(key))
            .arg(generation)
            .arg(value)
            .arg(ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Transient(format!("failed to write disclosure cache entry: {error}"))
            })?;

        Ok(stored == 1)
    }

    async fn invalidate(&self, keys: &[DisclosureCacheKey]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipeline = redis::pipe();
        pipeline.atomic();
        for key in keys {
            let generation_key = self.generation_key_for(key);
            pipeline
                .del(self.key_for(key))
                .ignore()
                .incr(&generation_key, 1)
                .ignore()
                .expire(&generation_key, GENERATION_TTL_SECONDS)
                .ignore();
        }

        let mut connection = self.connection().await?;
        let _: () = pipeline.query_async(&mut connection).await.map_err(|error| {
            AppError::Transient(format!("failed to invalidate disclosure cache entries: {error}"))
        })?;

        Ok(())
    }
}
