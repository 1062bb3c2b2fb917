use tsa_core::error::AppError;
use tsa_model::BackendError;
use tsa_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("vector/keyword store failed: {0}")]
    Store(#[from] StoreError),

    #[error("generation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("the request was cancelled")]
    Cancelled,

    #[error("web search request failed: {0}")]
    Web(#[from] reqwest::Error),
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Store(e) => e.into(),
            RagError::Backend(e) => e.into(),
            RagError::Cancelled => AppError::internal(anyhow::anyhow!("request cancelled")),
            RagError::Web(e) => AppError::internal(e),
        }
    }
}
