//! Search analytics: aggregate summaries and the recent-events tail.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tsa_core::AppError;
use tsa_core::domain::SearchEvent;
use tsa_store::events::MethodSummary;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

fn default_window_hours() -> i64 {
    24
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub window_hours: i64,
    pub by_method: Vec<MethodSummary>,
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<SummaryResponse>> {
    let by_method = state.events.summary(query.window_hours).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(SummaryResponse { window_hours: query.window_hours, by_method }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub events: Vec<SearchEvent>,
}

pub async fn recent(State(state): State<AppState>, Query(query): Query<RecentQuery>) -> ApiResult<Json<RecentResponse>> {
    let events = state.events.recent(query.limit).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(RecentResponse { events }))
}
