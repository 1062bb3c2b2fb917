//! Router assembly for the Technical Service Assistant gateway.
//!
//! Grounded in `bravo1goingdark-ucfp::server::build_router`/`start_server`:
//! public routes mounted bare, protected routes behind a layered middleware
//! stack, global layers (timeout, CORS, tracing) applied last so they wrap
//! the whole router.

pub mod analytics;
pub mod dto;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod sse;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/ollama-health", get(routes::health::ollama_health))
        .route("/api/health/details", get(routes::health::health_details))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/api/auth/reset-password", post(routes::auth::reset_password))
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route("/api/classify-query", post(routes::chat::classify_query))
        .route("/api/intelligent-route", post(routes::chat::intelligent_route))
}

fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rag-chat", post(routes::chat::rag_chat))
        .route("/api/hybrid-search", post(routes::chat::hybrid_search))
        .route("/api/fused-hybrid-search", post(routes::chat::fused_hybrid_search))
        .route("/api/intelligent-hybrid-search", post(routes::chat::intelligent_hybrid_search))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/change-password", post(routes::auth::change_password))
        .route("/api/auth/force-change-password", post(routes::auth::force_change_password))
        .route("/api/documents", get(routes::documents::list_documents))
        .route("/api/documents/{doc_id}", get(routes::documents::get_document))
        .route("/api/analytics/summary", get(routes::analytics::summary))
        .route("/api/analytics/recent", get(routes::analytics::recent))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    let documents = Router::new()
        .route("/api/documents/{doc_id}", delete(routes::documents::delete_document))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::permission_guard("documents.manage"),
        ));

    let users = Router::new()
        .route("/api/admin/users", get(routes::auth::list_users))
        .route("/api/admin/users/{user_id}", patch(routes::auth::update_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::permission_guard("users.manage"),
        ));

    let roles = Router::new()
        .route("/api/admin/roles", get(routes::auth::list_roles))
        .route("/api/admin/roles", post(routes::auth::create_role))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            crate::middleware::permission_guard("roles.manage"),
        ));

    documents.merge(users).merge(roles)
}

fn metrics_router(handle: PrometheusHandle) -> Router<()> {
    Router::new().route("/metrics", get(crate::metrics::metrics_handler)).with_state(handle)
}

/// Assembles the full HTTP surface: public routes, authenticated routes,
/// and the admin surface behind per-route permission guards, wrapped in the
/// request-id / access-log / rate-limit / auth pipeline and the outer
/// timeout + CORS + trace layers.
pub fn build_router(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let protected = authenticated_routes().merge(admin_routes(state.clone())).route_layer(
        axum::middleware::from_fn_with_state(state.clone(), crate::middleware::auth),
    );

    let app = public_routes()
        .merge(protected)
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), crate::middleware::rate_limit))
        .layer(axum::middleware::from_fn(crate::middleware::access_log))
        .layer(axum::middleware::from_fn(crate::middleware::request_id))
        .with_state(state);

    Router::new()
        .merge(app)
        .merge(metrics_router(metrics_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
