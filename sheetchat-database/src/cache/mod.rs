mod noop_store;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use noop_store::NoopCacheStore;
use redis_store::RedisCacheStore;

pub const DEFAULT_CHAT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_CHAT_RATE_LIMIT_MAX_HITS: u64 = 20;

#[derive(Clone, Debug)]
enum CacheBackend {
    Disabled(NoopCacheStore),
    Redis(RedisCacheStore),
}

#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    backend: CacheBackend,
    chat_rate_limit_window: Duration,
    chat_rate_limit_max_hits: u64,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self::with_backend(prefix, CacheBackend::Disabled(NoopCacheStore))
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self::with_backend(
            prefix,
            CacheBackend::Redis(RedisCacheStore::from_url(redis_url)?),
        ))
    }

    fn with_backend(prefix: impl Into<String>, backend: CacheBackend) -> Self {
        Self {
            key_prefix: prefix.into(),
            backend,
            chat_rate_limit_window: DEFAULT_CHAT_RATE_LIMIT_WINDOW,
            chat_rate_limit_max_hits: DEFAULT_CHAT_RATE_LIMIT_MAX_HITS,
        }
    }

    pub fn is_redis_enabled(&self) -> bool {
        matches!(self.backend, CacheBackend::Redis(_))
    }

    pub fn configure_chat_rate_limit(&mut self, window: Duration, max_hits: u64) {
        self.chat_rate_limit_window = window.max(Duration::from_secs(1));
        self.chat_rate_limit_max_hits = max_hits.max(1);
    }

    pub fn chat_rate_limit_window(&self) -> Duration {
        self.chat_rate_limit_window
    }

    pub fn chat_rate_limit_max_hits(&self) -> u64 {
        self.chat_rate_limit_max_hits
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled(_) => Ok(()),
            CacheBackend::Redis(store) => store.ping().await,
        }
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let value = match &self.backend {
            CacheBackend::Disabled(store) => store.get(key).await,
            CacheBackend::Redis(store) => store.get(key).await,
        }?;

        match value {
            Some(bytes) => {
                let parsed = serde_json::from_slice(&bytes).map_err(|e| {
                    anyhow::anyhow!("failed to deserialize cache value for `{key}`: {e}")
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let ttl_seconds = ttl.as_secs().max(1);
        let payload = serde_json::to_vec(value)
            .map_err(|e| anyhow::anyhow!("failed to serialize cache value for `{key}`: {e}"))?;

        match &self.backend {
            CacheBackend::Disabled(store) => store.set(key, payload, ttl_seconds).await,
            CacheBackend::Redis(store) => store.set(key, payload, ttl_seconds).await,
        }
    }

    pub async fn increment_with_window(&self, key: &str, window: Duration) -> anyhow::Result<u64> {
        let window_seconds = window.as_secs().max(1);
        match &self.backend {
            CacheBackend::Disabled(store) => store.increment_with_window(key, window_seconds).await,
            CacheBackend::Redis(store) => store.increment_with_window(key, window_seconds).await,
        }
    }

    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(
                ?e,
                cache_key = key,
                "cache get failed; falling back to database"
            ),
        }

        let loaded = loader().await?;

        if let Err(e) = self.set_json(key, &loaded, ttl).await {
            warn!(
                ?e,
                cache_key = key,
                "cache set failed; returning database value"
            );
        }

        Ok(loaded)
    }
}

pub fn chat_rate_limit_key(cache: &CacheService, user_id: Uuid) -> String {
    cache.key(format!("ratelimit:chat:{user_id}"))
}

pub fn dataset_sample_key(cache: &CacheService, dataset_id: Uuid, limit: u32) -> String {
    cache.key(format!("dataset:{dataset_id}:sample:{limit}"))
}
