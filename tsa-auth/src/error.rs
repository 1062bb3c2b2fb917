use thiserror::Error;
use tsa_core::AppError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is locked until {retry_at}")]
    AccountLocked { retry_at: chrono::DateTime<chrono::Utc> },

    #[error("account is not verified")]
    NotVerified,

    #[error("account is suspended")]
    Suspended,

    #[error("password change is required before continuing")]
    PasswordChangeRequired,

    #[error("token is invalid or expired")]
    InvalidToken,

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("permission denied: missing {0}")]
    MissingPermission(String),

    #[error(transparent)]
    Store(#[from] tsa_store::StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Authentication("invalid email or password".into()),
            AuthError::AccountLocked { retry_at } => AppError::AccountState {
                code: "ACCOUNT_LOCKED",
                message: format!("account is locked until {retry_at}"),
            },
            AuthError::NotVerified => AppError::AccountState {
                code: "ACCOUNT_NOT_VERIFIED",
                message: "email address has not been verified".into(),
            },
            AuthError::Suspended => {
                AppError::AccountState { code: "ACCOUNT_SUSPENDED", message: "account is suspended".into() }
            }
            AuthError::PasswordChangeRequired => AppError::AccountState {
                code: "PASSWORD_CHANGE_REQUIRED",
                message: "password change is required before continuing".into(),
            },
            AuthError::InvalidToken => AppError::Authentication("token is invalid or expired".into()),
            AuthError::RateLimited { retry_after_secs } => AppError::RateLimited { retry_after_secs },
            AuthError::MissingPermission(perm) => AppError::Authorization(perm),
            AuthError::Store(err) => err.into(),
            AuthError::Internal(err) => AppError::internal(err),
        }
    }
}
