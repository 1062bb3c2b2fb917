//! Analytics recorder persistence.
//!
//! `tsa-server` enqueues a `SearchEvent` synchronously (budget ≤50ms) onto
//! a bounded channel; a background task drains it into `search_events`
//! here. Overflow is handled by the channel, not by this module — see
//! `tsa-server::analytics::Recorder`.

use sqlx::{PgPool, Row};
use tsa_core::domain::{SearchEvent, SearchMethod};

use crate::error::StoreError;

pub struct EventStore {
    pool: PgPool,
}

fn method_to_str(method: SearchMethod) -> &'static str {
    match method {
        SearchMethod::Rag => "rag",
        SearchMethod::Hybrid => "hybrid",
        SearchMethod::Fusion => "fusion",
        SearchMethod::Web => "web",
        SearchMethod::Correction => "correction",
    }
}

impl EventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, event: &SearchEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO search_events
                 (ts, query, method, classification, strategy, rag_confidence, final_confidence,
                  latency_ms, chunk_count, web_count, fused_count, model, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.ts)
        .bind(&event.query)
        .bind(method_to_str(event.method))
        .bind(&event.classification)
        .bind(&event.strategy)
        .bind(event.rag_confidence)
        .bind(event.final_confidence)
        .bind(event.latency_ms)
        .bind(event.chunk_count)
        .bind(event.web_count)
        .bind(event.fused_count)
        .bind(&event.model)
        .bind(&event.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Aggregate counts/average-latency/average-confidence over the last
    /// `window_hours`, grouped by method — backs `GET /api/analytics/summary`.
    pub async fn summary(&self, window_hours: i64) -> Result<Vec<MethodSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT method, COUNT(*) AS count, AVG(latency_ms) AS avg_latency_ms,
                    AVG(final_confidence) AS avg_confidence
             FROM search_events
             WHERE ts > NOW() - ($1 || ' hours')::interval
             GROUP BY method",
        )
        .bind(window_hours.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MethodSummary {
                method: row.get("method"),
                count: row.get("count"),
                avg_latency_ms: row.get::<Option<f64>, _>("avg_latency_ms").unwrap_or(0.0),
                avg_confidence: row.get::<Option<f64>, _>("avg_confidence").unwrap_or(0.0) as f32,
            })
            .collect())
    }

    /// Most recent events — backs `GET /api/analytics/recent`.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SearchEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT ts, query, method, classification, strategy, rag_confidence, final_confidence,
                    latency_ms, chunk_count, web_count, fused_count, model, error
             FROM search_events ORDER BY ts DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchEvent {
                ts: row.get("ts"),
                query: row.get("query"),
                method: method_from_str(row.get::<String, _>("method").as_str()),
                classification: row.get("classification"),
                strategy: row.get("strategy"),
                rag_confidence: row.get("rag_confidence"),
                final_confidence: row.get("final_confidence"),
                latency_ms: row.get("latency_ms"),
                chunk_count: row.get("chunk_count"),
                web_count: row.get("web_count"),
                fused_count: row.get("fused_count"),
                model: row.get("model"),
                error: row.get("error"),
            })
            .collect())
    }
}

fn method_from_str(s: &str) -> SearchMethod {
    match s {
        "hybrid" => SearchMethod::Hybrid,
        "fusion" => SearchMethod::Fusion,
        "web" => SearchMethod::Web,
        "correction" => SearchMethod::Correction,
        _ => SearchMethod::Rag,
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MethodSummary {
    pub method: String,
    pub count: i64,
    pub avg_latency_ms: f64,
    pub avg_confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_strings() {
        for method in [
            SearchMethod::Rag,
            SearchMethod::Hybrid,
            SearchMethod::Fusion,
            SearchMethod::Web,
            SearchMethod::Correction,
        ] {
            assert_eq!(method_from_str(method_to_str(method)), method);
        }
    }
}
