//! Auth & RBAC: bcrypt password hashing, HS256 JWTs, login lockout,
//! sliding-window rate limiting, a permission cache, and the
//! email-verification / password-reset flows.

pub mod error;
pub mod jwt;
pub mod password;
pub mod permission_cache;
pub mod rate_limit;
pub mod state_machine;
pub mod tokens;

pub use error::AuthError;
pub use jwt::{Claims, TokenIssuer, TokenType};
pub use permission_cache::PermissionCache;
pub use rate_limit::RateLimiter;

use chrono::Utc;
use tsa_core::domain::{Permission, User, UserStatus};
use tsa_core::ids::{RoleId, UserId};
use tsa_store::{RbacStore, TokenPurpose, VerificationTokenStore};

/// Successful login result: the user record plus a fresh access/refresh
/// token pair.
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    store: RbacStore,
    verification: VerificationTokenStore,
    issuer: TokenIssuer,
    permission_cache: PermissionCache,
}

impl AuthService {
    pub fn new(
        store: RbacStore,
        verification: VerificationTokenStore,
        issuer: TokenIssuer,
        permission_cache: PermissionCache,
    ) -> Self {
        Self { store, verification, issuer, permission_cache }
    }

    /// Validates credentials, enforcing the account-state gate in the
    /// order: locked → not-verified → suspended → password-change-required
    /// → bcrypt check. A failed bcrypt check increments the lockout
    /// counter before returning `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.store.find_by_email(email).await?.ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        if user.is_locked(now) {
            return Err(AuthError::AccountLocked { retry_at: user.locked_until.unwrap() });
        }
        if user.status == UserStatus::Suspended {
            return Err(AuthError::Suspended);
        }
        if !user.verified || user.status == UserStatus::PendingVerification {
            return Err(AuthError::NotVerified);
        }

        if !password::verify(password, &user.password_hash)? {
            self.store.record_failed_login(user.user_id).await?;
            return Err(AuthError::InvalidCredentials);
        }

        if user.password_change_required {
            self.store.record_successful_login(user.user_id).await?;
            return Err(AuthError::PasswordChangeRequired);
        }

        self.store.record_successful_login(user.user_id).await?;

        let access_token = self.issuer.issue_access(user.user_id, user.role_id)?;
        let refresh_token = self.issuer.issue_refresh(user.user_id, user.role_id)?;
        Ok(Session { user, access_token, refresh_token })
    }

    /// Exchanges a refresh token for a new access token, re-checking
    /// current account state (a token issued before a suspension must not
    /// keep working).
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.issuer.verify(refresh_token, TokenType::Refresh)?;
        let user_id = UserId(claims.sub.parse().map_err(|_| AuthError::InvalidToken)?);
        let user = self.store.find_by_id(user_id).await?.ok_or(AuthError::InvalidToken)?;

        if user.status == UserStatus::Suspended || user.status == UserStatus::Inactive {
            return Err(AuthError::Suspended);
        }

        self.issuer.issue_access(user.user_id, user.role_id)
    }

    pub async fn change_password(&self, user_id: UserId, new_password: &str) -> Result<(), AuthError> {
        let hash = password::hash(new_password)?;
        self.store.set_password_hash(user_id, &hash).await?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<Option<tokens::IssuedToken>, AuthError> {
        // The response to the caller is always generic ("if that address
        // exists, a reset link was sent") regardless of whether the
        // account exists, to avoid leaking which emails are registered.
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(None);
        };
        let issued = tokens::issue(tokens::RESET_TTL_SECS);
        self.verification
            .insert(&issued.hash, user.user_id, TokenPurpose::PasswordReset, issued.expires_at)
            .await?;
        self.store
            .record_audit_event(Some(user.user_id), "password_reset_requested", &serde_json::json!({}))
            .await?;
        Ok(Some(issued))
    }

    /// Consumes a password-reset token and sets the new password. The
    /// token is marked used even if it has already expired, so a replayed
    /// link never succeeds twice.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let hash = tokens::hash_token(token);
        let record = self
            .verification
            .find_valid(&hash, TokenPurpose::PasswordReset)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let password_hash = password::hash(new_password)?;
        self.store.set_password_hash(record.user_id, &password_hash).await?;
        self.verification.mark_used(&hash).await?;
        self.store
            .record_audit_event(Some(record.user_id), "password_reset_completed", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Issues an email-verification token for a freshly registered user.
    pub async fn issue_verification_token(&self, user_id: UserId) -> Result<tokens::IssuedToken, AuthError> {
        let issued = tokens::issue(tokens::VERIFICATION_TTL_SECS);
        self.verification
            .insert(&issued.hash, user_id, TokenPurpose::EmailVerification, issued.expires_at)
            .await?;
        Ok(issued)
    }

    /// Idempotent: verifying the same token twice returns `Ok(())` both
    /// times, only the first call transitions the account out of
    /// `pending_verification`. Contrast with [`Self::confirm_password_reset`],
    /// whose replay must keep failing.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let hash = tokens::hash_token(token);
        let record = self
            .verification
            .find_any(&hash, TokenPurpose::EmailVerification)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if record.used_at.is_some() {
            return Ok(());
        }

        self.store.mark_verified(record.user_id).await?;
        self.verification.mark_used(&hash).await?;
        Ok(())
    }

    /// Sets a new password for a user flagged `password_change_required`,
    /// bypassing the old-password check `change_password` would otherwise
    /// need — the caller has already been authenticated via the
    /// `PasswordChangeRequired` login gate, not a fresh credential check.
    pub async fn force_change_password(&self, user_id: UserId, new_password: &str) -> Result<(), AuthError> {
        let hash = password::hash(new_password)?;
        self.store.set_password_hash(user_id, &hash).await?;
        self.store
            .record_audit_event(Some(user_id), "password_change_forced", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Verifies a bearer token presented on an incoming request. Used by
    /// the HTTP layer's auth middleware, ahead of any permission check.
    pub fn verify_access_token(&self, token: &str) -> Result<jwt::Claims, AuthError> {
        self.issuer.verify(token, TokenType::Access)
    }

    /// Checks whether `user_id` (holding `role_id` as their primary role)
    /// has `permission`, consulting the cache first and falling back to
    /// the store on a miss. The effective permission set is the union of
    /// the primary role's grants and any secondary roles in `user_roles`,
    /// so this is keyed per-user rather than per-role.
    pub async fn has_permission(
        &self,
        user_id: UserId,
        role_id: RoleId,
        permission: &str,
    ) -> Result<bool, AuthError> {
        let permissions = self.permissions_for_user(user_id, role_id).await?;
        Ok(permissions.iter().any(|p| p.name == permission))
    }

    async fn permissions_for_user(&self, user_id: UserId, role_id: RoleId) -> Result<Vec<Permission>, AuthError> {
        if let Some(cached) = self.permission_cache.get(user_id) {
            return Ok(cached);
        }
        let permissions = self.store.permissions_for_user(user_id, role_id).await?;
        self.permission_cache.put(user_id, permissions.clone());
        Ok(permissions)
    }

    pub fn invalidate_permissions(&self, user_id: UserId) {
        self.permission_cache.invalidate(user_id);
    }
}
