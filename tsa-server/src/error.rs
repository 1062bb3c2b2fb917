//! Maps `AppError` to the `{success:false, message, error_code, details?}`
//! envelope and the status codes in spec's error taxonomy.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tsa_core::{AppError, ErrorKind};

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Wrapper so `AppError` (defined in `tsa-core`, with no axum dependency)
/// can implement `IntoResponse` here without an orphan-rule violation.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::AccountState => StatusCode::FORBIDDEN,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UpstreamTimeout => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(err.kind());
        let error_code = err.error_code();

        // Internal errors get a generic client-facing message; the real
        // cause is logged by the access-log middleware's `tracing::error!`.
        let message = match &err {
            AppError::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };
        if matches!(err, AppError::Internal(_)) {
            tracing::error!(error = %err, "internal error");
        }

        let mut headers = HeaderMap::new();
        if let AppError::RateLimited { retry_after_secs } = &err {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                headers.insert(header::RETRY_AFTER, value);
            }
        }

        let body = Json(ErrorEnvelope { success: false, message, error_code, details: None });
        (status, headers, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
