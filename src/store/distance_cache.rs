//! Component J — the optional persistent half of the distance cache. A run
//! never depends on this being present: `NullDistanceCacheStore` is the
//! always-valid fallback wired in when no backing store is configured or
//! when it errors (a Transient failure per the error-handling design).

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tracing::info;

use crate::distance::oracle::CacheKey;
use crate::domain::error::StoreError;

#[async_trait]
pub trait DistanceCacheStore: Send + Sync {
    async fn get(&self, key: CacheKey) -> Result<Option<(f64, f64)>, StoreError>;
    async fn put(&self, key: CacheKey, km: f64, minutes: f64) -> Result<(), StoreError>;
}

/// Canonical on-disk key form: the two ticket ids in lexicographic order,
/// separated by `:`.
fn key_string(key: CacheKey) -> String {
    format!("{}:{}", key.0 .0, key.1 .0)
}

pub struct SqliteDistanceCacheStore {
    pool: SqlitePool,
}

impl SqliteDistanceCacheStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        info!(database_url, "connected to distance cache store");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS distance_cache (
                pair_key TEXT PRIMARY KEY,
                km REAL NOT NULL,
                minutes REAL NOT NULL,
                computed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(SqliteDistanceCacheStore { pool })
    }
}

#[async_trait]
impl DistanceCacheStore for SqliteDistanceCacheStore {
    async fn get(&self, key: CacheKey) -> Result<Option<(f64, f64)>, StoreError> {
        let row = sqlx::query("SELECT km, minutes FROM distance_cache WHERE pair_key = ?")
            .bind(key_string(key))
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(r) => Some((r.try_get("km")?, r.try_get("minutes")?)),
            None => None,
        })
    }

    async fn put(&self, key: CacheKey, km: f64, minutes: f64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO distance_cache (pair_key, km, minutes, computed_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(pair_key) DO UPDATE SET
                km = excluded.km, minutes = excluded.minutes, computed_at = excluded.computed_at
            "#,
        )
        .bind(key_string(key))
        .bind(km)
        .bind(minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Always-on fallback used when no backing store is configured. Entries
/// never invalidate within a run; background eviction is out of scope, so a
/// no-op store is simply "no persistence beyond the in-memory cache".
pub struct NullDistanceCacheStore;

#[async_trait]
impl DistanceCacheStore for NullDistanceCacheStore {
    async fn get(&self, _key: CacheKey) -> Result<Option<(f64, f64)>, StoreError> {
        Ok(None)
    }

    async fn put(&self, _key: CacheKey, _km: f64, _minutes: f64) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TicketId;

    #[test]
    fn key_string_is_canonical() {
        let key = (TicketId(1), TicketId(2));
        assert_eq!(key_string(key), "1:2");
    }
}
