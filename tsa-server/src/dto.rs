//! Request/response bodies shared across route handlers.

use serde::{Deserialize, Serialize};
use tsa_core::domain::{FusedSource, Role, SearchMethod, User, UserStatus};
use tsa_core::ids::{RoleId, UserId};

#[derive(Debug, Serialize)]
pub struct ApiOk {
    pub success: bool,
}

impl Default for ApiOk {
    fn default() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HybridSearchRequest {
    pub query: String,
    #[serde(default)]
    pub enable_web_search: Option<bool>,
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ContextItem {
    pub label: String,
    pub origin: String,
    pub content: String,
    pub score: f32,
    pub is_web: bool,
}

impl From<&FusedSource> for ContextItem {
    fn from(source: &FusedSource) -> Self {
        Self {
            label: source.label.clone(),
            origin: source.origin.clone(),
            content: source.content.clone(),
            score: source.score,
            is_web: source.is_web,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub answer: String,
    pub search_method: SearchMethod,
    pub context_used: Vec<ContextItem>,
    pub confidence_score: f32,
    pub context_truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct Classification {
    pub query_type: tsa_core::query::QueryCategory,
    pub complexity: tsa_core::query::Complexity,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct ClassifyQueryResponse {
    pub classification: Classification,
    pub strategy: tsa_core::query::RetrievalStrategy,
    pub chunk_target: usize,
    pub prefer_web: bool,
}

#[derive(Debug, Serialize)]
pub struct IntelligentRouteResponse {
    pub selected_model: String,
    pub selected_backend: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_id: RoleId,
    pub role_name: String,
    pub status: UserStatus,
    pub verified: bool,
    pub password_change_required: bool,
}

impl UserProfile {
    pub fn new(user: &User, role_name: String) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role_id: user.role_id,
            role_name,
            status: user.status,
            verified: user.verified,
            password_change_required: user.password_change_required,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForceChangePasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role_id: Option<i64>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleListResponse {
    pub roles: Vec<Role>,
}
