//! User/role/permission persistence backing auth and RBAC.
//!
//! Entity shapes are grounded in `original_source/utils/rbac_models.py`'s
//! `User`/`Role`/`Permission` Pydantic models, generalized from its fixed
//! `{admin,employee,guest,system}` roles into a DB-backed role→permission
//! mapping: `role_permissions` grants permissions to a role, and
//! `user_roles` grants a user secondary roles beyond their primary
//! `users.role_id`. A user's effective permissions are the union of both.

use chrono::Utc;
use sqlx::{PgPool, Row};
use tsa_core::domain::{Permission, Role, User, UserStatus};
use tsa_core::ids::{RoleId, UserId};

use crate::error::StoreError;

pub struct RbacStore {
    pool: PgPool,
}

fn status_from_str(s: &str) -> UserStatus {
    match s {
        "inactive" => UserStatus::Inactive,
        "suspended" => UserStatus::Suspended,
        "pending_verification" => UserStatus::PendingVerification,
        _ => UserStatus::Active,
    }
}

fn status_to_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Inactive => "inactive",
        UserStatus::Suspended => "suspended",
        UserStatus::PendingVerification => "pending_verification",
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        user_id: UserId(row.get("user_id")),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role_id: RoleId(row.get("role_id")),
        status: status_from_str(row.get::<String, _>("status").as_str()),
        verified: row.get("verified"),
        login_attempts: row.get("login_attempts"),
        locked_until: row.get("locked_until"),
        password_change_required: row.get("password_change_required"),
        last_login: row.get("last_login"),
    }
}

impl RbacStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash, first_name, last_name, role_id, status,
                    verified, login_attempts, locked_until, password_change_required, last_login
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash, first_name, last_name, role_id, status,
                    verified, login_attempts, locked_until, password_change_required, last_login
             FROM users WHERE user_id = $1",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role_id: RoleId,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, role_id, status, verified, password_change_required)
             VALUES ($1, $2, $3, 'pending_verification', FALSE, FALSE)
             RETURNING user_id, email, password_hash, first_name, last_name, role_id, status,
                       verified, login_attempts, locked_until, password_change_required, last_login",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role_id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_user(&row))
    }

    /// Records a failed login attempt; locks the account for 15 minutes
    /// once the 5th consecutive failure is reached.
    pub async fn record_failed_login(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET
                 login_attempts = login_attempts + 1,
                 locked_until = CASE WHEN login_attempts + 1 >= 5
                                     THEN NOW() + INTERVAL '15 minutes'
                                     ELSE locked_until END
             WHERE user_id = $1",
        )
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_successful_login(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET login_attempts = 0, locked_until = NULL, last_login = NOW()
             WHERE user_id = $1",
        )
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET status = $1 WHERE user_id = $2")
            .bind(status_to_str(status))
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_verified(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET verified = TRUE, status = 'active' WHERE user_id = $1")
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_password_hash(&self, user_id: UserId, hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET password_hash = $1, password_change_required = FALSE WHERE user_id = $2",
        )
        .bind(hash)
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Paginated listing for `GET /api/admin/users`, newest first.
    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, email, password_hash, first_name, last_name, role_id, status,
                    verified, login_attempts, locked_until, password_change_required, last_login
             FROM users ORDER BY user_id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    /// Updates a user's role and/or status. `PATCH /api/admin/users/{id}`
    /// passes whichever fields the caller supplied; `None` leaves a
    /// column unchanged.
    pub async fn update_user(
        &self,
        user_id: UserId,
        role_id: Option<RoleId>,
        status: Option<UserStatus>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET
                 role_id = COALESCE($1, role_id),
                 status = COALESCE($2, status)
             WHERE user_id = $3",
        )
        .bind(role_id.map(|r| r.0))
        .bind(status.map(status_to_str))
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query("SELECT role_id, name, description, is_system_role FROM roles ORDER BY role_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Role {
                role_id: RoleId(row.get("role_id")),
                name: row.get("name"),
                description: row.get("description"),
                is_system_role: row.get("is_system_role"),
            })
            .collect())
    }

    pub async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError> {
        let row = sqlx::query(
            "INSERT INTO roles (name, description, is_system_role) VALUES ($1, $2, FALSE)
             RETURNING role_id, name, description, is_system_role",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(Role {
            role_id: RoleId(row.get("role_id")),
            name: row.get("name"),
            description: row.get("description"),
            is_system_role: row.get("is_system_role"),
        })
    }

    pub async fn get_role(&self, role_id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT role_id, name, description, is_system_role FROM roles WHERE role_id = $1")
            .bind(role_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Role {
            role_id: RoleId(row.get("role_id")),
            name: row.get("name"),
            description: row.get("description"),
            is_system_role: row.get("is_system_role"),
        }))
    }

    /// Effective permissions for a user: the union of their primary role's
    /// grants and the grants of every secondary role listed in
    /// `user_roles`. Used to populate `tsa-auth`'s permission cache on a
    /// miss.
    pub async fn permissions_for_user(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<Vec<Permission>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT p.name, p.resource, p.action
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.permission_id
             WHERE rp.role_id = $1
                OR rp.role_id IN (SELECT role_id FROM user_roles WHERE user_id = $2)",
        )
        .bind(role_id.0)
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Permission { name: row.get("name"), resource: row.get("resource"), action: row.get("action") })
            .collect())
    }

    /// Grants `role_id` to `user_id` as a secondary role.
    pub async fn grant_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id.0)
            .bind(role_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_audit_event(
        &self,
        user_id: Option<UserId>,
        event_type: &str,
        detail: &serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_logs (user_id, event_type, detail, occurred_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id.map(|u| u.0))
        .bind(event_type)
        .bind(detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            UserStatus::Active,
            UserStatus::Inactive,
            UserStatus::Suspended,
            UserStatus::PendingVerification,
        ] {
            assert_eq!(status_from_str(status_to_str(status)), status);
        }
    }

    #[test]
    fn unknown_status_string_defaults_to_active() {
        assert_eq!(status_from_str("bogus"), UserStatus::Active);
    }
}
