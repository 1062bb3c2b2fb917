use thiserror::Error;
use tsa_core::AppError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no healthy backend is available")]
    Unavailable,

    #[error("backend {1} timed out after {0:?}")]
    Timeout(std::time::Duration, String),

    #[error("backend {0} returned an error: {1}")]
    Upstream(String, String),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable => AppError::BackendUnavailable,
            BackendError::Timeout(_, instance) => {
                AppError::UpstreamTimeout(format!("backend {instance} did not respond in time"))
            }
            BackendError::Upstream(instance, msg) => {
                AppError::internal(anyhow::anyhow!("backend {instance}: {msg}"))
            }
        }
    }
}
