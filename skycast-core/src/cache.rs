//! Read-through / write-through caching for any [`Fetcher`].
//!
//! Reads are best effort: a missing, unreadable or corrupt entry falls back to
//! the inner fetcher. Writes are best effort too and never turn a successful
//! fetch into a failure.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{CacheError, FetchError, Fetcher, WeatherReading};

/// Lifetime of a cached reading, applied at write time.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub fn cache_key(city: &str) -> String {
    format!("weather:{city}")
}

/// Minimal key/value surface the cache decorator needs.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis-backed [`CacheStore`] over a multiplexed async connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

/// Upper bound on connecting to redis and getting the first `PING` back.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl RedisStore {
    /// Connect and verify the server answers `PING` within [`CONNECT_TIMEOUT`].
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        Self::connect_within(url, CONNECT_TIMEOUT).await
    }

    pub async fn connect_within(url: &str, limit: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;

        let handshake = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, CacheError>(conn)
        };

        let conn = tokio::time::timeout(limit, handshake)
            .await
            .map_err(|_| CacheError::Timeout(limit))??;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}

/// Decorates an inner fetcher with a shared cache keyed by `weather:<city>`.
#[derive(Debug, Clone)]
pub struct CachingFetcher {
    inner: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachingFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>) -> Self {
        Self { inner, store, ttl: CACHE_TTL }
    }

    async fn read_cached(&self, key: &str, city: &str) -> Option<WeatherReading> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache GET failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(reading) => {
                tracing::debug!(city, "cache hit");
                Some(reading)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cached weather entry is corrupt");
                None
            }
        }
    }

    async fn write_back(&self, key: &str, reading: &WeatherReading) {
        let blob = match serde_json::to_string(reading) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to serialize weather for cache");
                return;
            }
        };

        if let Err(err) = self.store.set_ex(key, &blob, self.ttl).await {
            tracing::warn!(key, error = %err, "cache SET failed");
        }
    }
}

#[async_trait]
impl Fetcher for CachingFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        city: &str,
    ) -> Result<WeatherReading, FetchError> {
        let key = cache_key(city);

        // A cancelled read counts as a miss; the inner fetcher reports the cancellation.
        let cached = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            cached = self.read_cached(&key, city) => cached,
        };
        if let Some(reading) = cached {
            return Ok(reading);
        }

        let reading = self.inner.fetch(cancel, city).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => tracing::debug!(key = %key, "cache write abandoned"),
            () = self.write_back(&key, &reading) => {}
        }

        Ok(reading)
    }
}
