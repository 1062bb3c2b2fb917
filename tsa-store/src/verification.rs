//! Single-use, hashed email-verification and password-reset tokens.
//!
//! Mirrors `verification_tokens(token_hash, user_id, purpose, expires_at,
//! used_at)`: only the SHA-256 hash is ever persisted, consuming a token
//! is idempotent-safe (checked via `used_at IS NULL`), and `purpose`
//! keeps the two token kinds from being swapped at the handler.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tsa_core::ids::UserId;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

pub struct VerificationToken {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// A token row regardless of whether it has already been consumed, used to
/// tell "already used" apart from "never existed" at the call site.
pub struct VerificationRecord {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

pub struct VerificationTokenStore {
    pool: PgPool,
}

impl VerificationTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        token_hash: &str,
        user_id: UserId,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO verification_tokens (token_hash, user_id, purpose, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(token_hash)
        .bind(user_id.0)
        .bind(purpose.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the token's owner if it exists, matches `purpose`, is
    /// unexpired, and has not already been consumed.
    pub async fn find_valid(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<VerificationToken>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, expires_at FROM verification_tokens
             WHERE token_hash = $1 AND purpose = $2 AND used_at IS NULL AND expires_at > NOW()",
        )
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| VerificationToken { user_id: UserId(row.get("user_id")), expires_at: row.get("expires_at") }))
    }

    /// Same lookup as [`Self::find_valid`] but ignores `used_at`, so a
    /// caller can distinguish "already consumed" (still returned here, a
    /// retry of a one-shot action) from "never existed or wrong purpose"
    /// (not returned at all).
    pub async fn find_any(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, expires_at, used_at FROM verification_tokens
             WHERE token_hash = $1 AND purpose = $2 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| VerificationRecord {
            user_id: UserId(row.get("user_id")),
            expires_at: row.get("expires_at"),
            used_at: row.get("used_at"),
        }))
    }

    pub async fn mark_used(&self, token_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE verification_tokens SET used_at = NOW() WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_strings_are_distinct() {
        assert_ne!(TokenPurpose::EmailVerification.as_str(), TokenPurpose::PasswordReset.as_str());
    }
}
