//! Web search result cache.
//!
//! Ported from `original_source/reranker/cache.py`: normalize the query,
//! hash it with SHA-256, and use the hash as the cache key with a TTL.
//! Expired rows are purged lazily on read; rows above `max_rows` are
//! evicted oldest-first on write.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tsa_core::domain::CachedWebResult;

use crate::error::StoreError;

pub struct WebCache {
    pool: PgPool,
    enabled: bool,
    ttl_seconds: i64,
    max_rows: i64,
}

impl WebCache {
    pub fn new(pool: PgPool, enabled: bool, ttl: std::time::Duration, max_rows: u64) -> Self {
        Self { pool, enabled, ttl_seconds: ttl.as_secs() as i64, max_rows: max_rows as i64 }
    }

    pub fn normalize(query: &str) -> String {
        query.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn hash(normalized: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns cached results if present and unexpired. Silently returns
    /// `None` and logs a warning on any store error — cache reads must
    /// never fail the request; this cache is fail-open.
    pub async fn get(&self, query: &str) -> Option<Vec<CachedWebResult>> {
        if !self.enabled {
            return None;
        }
        match self.try_get(query).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(error = %err, "web search cache read failed, treating as miss");
                None
            }
        }
    }

    async fn try_get(&self, query: &str) -> Result<Option<Vec<CachedWebResult>>, StoreError> {
        let normalized = Self::normalize(query);
        let query_hash = Self::hash(&normalized);

        let row = sqlx::query(
            "SELECT results_json, expires_at, hit_count FROM web_search_cache WHERE query_hash = $1",
        )
        .bind(&query_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if expires_at < Utc::now() {
            sqlx::query("DELETE FROM web_search_cache WHERE query_hash = $1")
                .bind(&query_hash)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let _ = sqlx::query("UPDATE web_search_cache SET hit_count = hit_count + 1 WHERE query_hash = $1")
            .bind(&query_hash)
            .execute(&self.pool)
            .await;

        let results_json: serde_json::Value = row.get("results_json");
        let results: Vec<CachedWebResult> = serde_json::from_value(results_json)?;
        Ok(Some(results))
    }

    /// Stores `results` under `query`'s normalized hash (insert-or-replace),
    /// then evicts the oldest rows above `max_rows` if configured. Failures
    /// are logged, not propagated — a cache write must not fail the
    /// request that produced the results.
    pub async fn store(&self, query: &str, results: &[CachedWebResult]) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.try_store(query, results).await {
            tracing::warn!(error = %err, "web search cache write failed");
        }
    }

    async fn try_store(&self, query: &str, results: &[CachedWebResult]) -> Result<(), StoreError> {
        let normalized = Self::normalize(query);
        let query_hash = Self::hash(&normalized);
        let results_json = serde_json::to_value(results)?;
        let expires_at = Utc::now() + ChronoDuration::seconds(self.ttl_seconds);

        sqlx::query(
            "INSERT INTO web_search_cache (query_hash, normalized_query, results_json, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (query_hash) DO UPDATE SET
                 results_json = EXCLUDED.results_json,
                 expires_at = EXCLUDED.expires_at",
        )
        .bind(&query_hash)
        .bind(&normalized)
        .bind(&results_json)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if self.max_rows > 0 {
            let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM web_search_cache")
                .fetch_one(&self.pool)
                .await?
                .get("count");

            if count > self.max_rows {
                let overflow = count - self.max_rows;
                sqlx::query(
                    "DELETE FROM web_search_cache WHERE id IN (
                         SELECT id FROM web_search_cache ORDER BY created_at ASC LIMIT $1
                     )",
                )
                .bind(overflow)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(WebCache::normalize("  How Do I   Reset VPN? "), "how do i reset vpn?");
    }

    #[test]
    fn hash_is_stable_for_equivalent_queries() {
        let a = WebCache::hash(&WebCache::normalize("Reset VPN"));
        let b = WebCache::hash(&WebCache::normalize("  reset   vpn"));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_differs_for_different_queries() {
        let a = WebCache::hash(&WebCache::normalize("reset vpn"));
        let b = WebCache::hash(&WebCache::normalize("reset printer"));
        assert_ne!(a, b);
    }
}
