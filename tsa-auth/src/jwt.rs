//! HS256 access/refresh tokens.
//!
//! Access tokens last 30 minutes, refresh tokens 7 days; a `type` claim
//! distinguishes them so a refresh token can never be used as an access
//! token even though both are signed with the same secret.

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tsa_core::ids::{RoleId, UserId};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role_id: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

pub struct TokenIssuer {
    secret: String,
    access_ttl: std::time::Duration,
    refresh_ttl: std::time::Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_ttl: std::time::Duration, refresh_ttl: std::time::Duration) -> Self {
        Self { secret: secret.into(), access_ttl, refresh_ttl }
    }

    pub fn issue_access(&self, user_id: UserId, role_id: RoleId) -> Result<String, AuthError> {
        self.issue(user_id, role_id, TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, user_id: UserId, role_id: RoleId) -> Result<String, AuthError> {
        self.issue(user_id, role_id, TokenType::Refresh, self.refresh_ttl)
    }

    fn issue(
        &self,
        user_id: UserId,
        role_id: RoleId,
        token_type: TokenType,
        ttl: std::time::Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role_id: role_id.0,
            token_type,
            iat: now.timestamp(),
            exp: (now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::zero())).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| AuthError::Internal(e.into()))
    }

    /// Verifies signature + expiry and checks the claim's `type` matches
    /// `expected`. A refresh token presented where an access token is
    /// expected (or vice versa) is rejected as `InvalidToken`.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-secret-at-least-this-long",
            std::time::Duration::from_secs(30 * 60),
            std::time::Duration::from_secs(7 * 24 * 60 * 60),
        )
    }

    #[test]
    fn access_token_round_trips() {
        let issuer = issuer();
        let token = issuer.issue_access(UserId(42), RoleId(1)).unwrap();
        let claims = issuer.verify(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role_id, 1);
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let issuer = issuer();
        let token = issuer.issue_refresh(UserId(1), RoleId(1)).unwrap();
        assert!(matches!(issuer.verify(&token, TokenType::Access), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_different_secret_is_rejected() {
        let issuer_a = issuer();
        let issuer_b = TokenIssuer::new(
            "a-completely-different-secret",
            std::time::Duration::from_secs(1800),
            std::time::Duration::from_secs(604_800),
        );
        let token = issuer_a.issue_access(UserId(1), RoleId(1)).unwrap();
        assert!(matches!(issuer_b.verify(&token, TokenType::Access), Err(AuthError::InvalidToken)));
    }
}
