//! Error taxonomy shared across the gateway.
//!
//! Component crates define their own `thiserror` enums (`BackendError`,
//! `RagError`, `StoreError`, `AuthError`) and convert into [`AppError`] at
//! the crate boundary; `tsa-server` maps [`ErrorKind`] to an HTTP status
//! and the `{success:false, message, error_code, details?}` response
//! envelope.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Coarse error class, used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    AccountState,
    RateLimited,
    NotFound,
    UpstreamUnavailable,
    UpstreamTimeout,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("permission denied: {0}")]
    Authorization(String),

    #[error("account state prevents this action: {code}")]
    AccountState { code: &'static str, message: String },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no healthy backend is available")]
    BackendUnavailable,

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AppError::Internal(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Authentication(_) => ErrorKind::Authentication,
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::AccountState { .. } => ErrorKind::AccountState,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::BackendUnavailable => ErrorKind::UpstreamUnavailable,
            AppError::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable error code, used as `error_code` in the envelope
    /// and as the SSE `error` frame's `code` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) => "UNAUTHORIZED",
            AppError::Authorization(_) => "FORBIDDEN",
            AppError::AccountState { code, .. } => code,
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BackendUnavailable => "BACKEND_UNAVAILABLE",
            AppError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_unavailable_has_stable_code() {
        assert_eq!(AppError::BackendUnavailable.error_code(), "BACKEND_UNAVAILABLE");
        assert_eq!(AppError::BackendUnavailable.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn account_state_carries_specific_code() {
        let err = AppError::AccountState {
            code: "PASSWORD_CHANGE_REQUIRED",
            message: "change your password".into(),
        };
        assert_eq!(err.error_code(), "PASSWORD_CHANGE_REQUIRED");
        assert_eq!(err.kind(), ErrorKind::AccountState);
    }
}
