use sqlx::{PgPool, migrate::Migrator};

use crate::cache::CacheService;

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres pool plus the cache that fronts it.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
}

impl Database {
    /// Pool-only handle; caching and rate limiting are disabled.
    pub fn new(pool: PgPool) -> Self {
        Self::with_cache(pool, CacheService::disabled("sheetchat:prod"))
    }

    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}
