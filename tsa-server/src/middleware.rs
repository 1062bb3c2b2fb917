//! The request pipeline: request ID → access log → rate limit → auth →
//! permission guard → handler. Each stage is an `axum::middleware::from_fn`
//! (or `from_fn_with_state`) layer applied in that order, grounded in the
//! hand-rolled `api_key_auth`/`request_id`/`log_requests` layers of
//! `crates/server/src/middleware.rs` in the UCFP matcher pipeline, adapted
//! from single-tenant API-key auth to bearer-JWT + RBAC.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tsa_core::AppError;
use tsa_core::ids::{RequestId, RoleId, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, attached to request extensions by [`auth`] and
/// read back by [`permission_guard`] and handlers that need `user_id`.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// Generates (or propagates, via `x-request-id`) a request id, attaches it
/// to request extensions, and echoes it on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| RequestId(s.to_string()))
        .unwrap_or_default();

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = request_id.0.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Structured start/end access log carrying the request id, method, path,
/// status, and latency.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request.extensions().get::<RequestId>().cloned().unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request completed"
    );
    response
}

/// Sliding-window rate limit, keyed by client address. Runs ahead of auth
/// so an unauthenticated flood of login attempts is still bounded.
pub async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match state.rate_limiter.check(&addr.ip().to_string()) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after) => {
            Err(ApiError(AppError::RateLimited { retry_after_secs: retry_after.as_secs().max(1) }))
        }
    }
}

/// Extracts the bearer access token, verifies it, and attaches a
/// [`Principal`] to request extensions. Routes that don't require auth
/// (health, metrics, login) are mounted outside this layer's router scope.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError(AppError::Authentication("missing bearer token".into())))?;

    let claims = state.auth.verify_access_token(token).map_err(AppError::from).map_err(ApiError)?;
    let user_id = UserId(claims.sub.parse().map_err(|_| ApiError(AppError::Authentication("malformed subject claim".into())))?);
    let role_id = RoleId(claims.role_id);

    request.extensions_mut().insert(Principal { user_id, role_id });
    Ok(next.run(request).await)
}

type GuardFuture = futures::future::BoxFuture<'static, Result<Response, ApiError>>;

/// Builds a permission-guard middleware for a fixed permission name, e.g.
/// `permission_guard("documents.manage")`. Must run after [`auth`] so a
/// [`Principal`] is already present in extensions.
pub fn permission_guard(
    permission: &'static str,
) -> impl Fn(State<AppState>, Request<Body>, Next) -> GuardFuture + Clone {
    move |State(state): State<AppState>, request: Request<Body>, next: Next| {
        Box::pin(async move {
            let principal = *request
                .extensions()
                .get::<Principal>()
                .ok_or_else(|| ApiError(AppError::Authentication("no authenticated principal".into())))?;

            let allowed = state
                .auth
                .has_permission(principal.user_id, principal.role_id, permission)
                .await
                .map_err(AppError::from)
                .map_err(ApiError)?;
            if !allowed {
                return Err(ApiError(AppError::Authorization(permission.to_string())));
            }
            Ok(next.run(request).await)
        })
    }
}
