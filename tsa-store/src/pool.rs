//! Connection pool construction: sqlx's async Postgres pool, sized to
//! `2 × max_concurrent`.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tsa_core::config::Settings;

use crate::error::StoreError;

/// Default assumed concurrency used to size the pool when the caller has
/// no better estimate; `tsa-server` overrides this from its own worker
/// count where available.
const DEFAULT_MAX_CONCURRENT: u32 = 16;

pub async fn connect(settings: &Settings) -> Result<PgPool, StoreError> {
    connect_with_concurrency(settings, DEFAULT_MAX_CONCURRENT).await
}

pub async fn connect_with_concurrency(
    settings: &Settings,
    max_concurrent: u32,
) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_concurrent * 2)
        .connect(&settings.db.connection_string())
        .await
        .map_err(StoreError::Database)
}

/// Runs the bundled schema migration. Idempotent (`CREATE TABLE IF NOT
/// EXISTS`/`ON CONFLICT DO NOTHING`); called once at startup by `tsa-cli`.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(StoreError::Migration)
}
