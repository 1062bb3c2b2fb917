//! Login, token refresh, self-service and forced password changes,
//! email verification, and the admin user/role management surface.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use tsa_core::AppError;
use tsa_core::domain::UserStatus;
use tsa_core::ids::{RoleId, UserId};

use crate::dto::{
    ChangePasswordRequest, CreateRoleRequest, ForceChangePasswordRequest, ForgotPasswordRequest,
    LoginRequest, LoginResponse, MeResponse, RefreshRequest, RefreshResponse, ResetPasswordRequest,
    RoleListResponse, UpdateUserRequest, UserListResponse, UserProfile, VerifyEmailRequest,
};
use crate::dto::ApiOk;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::state::AppState;

async fn role_name(state: &AppState, role_id: RoleId) -> Result<String, AppError> {
    Ok(state.rbac.get_role(role_id).await?.map(|r| r.name).unwrap_or_else(|| "unknown".to_string()))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let session = state.auth.login(&body.email, &body.password).await.map_err(AppError::from).map_err(ApiError)?;
    let role_name = role_name(&state, session.user.role_id).await.map_err(ApiError)?;
    Ok(Json(LoginResponse {
        success: true,
        user: UserProfile::new(&session.user, role_name),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

pub async fn refresh(State(state): State<AppState>, Json(body): Json<RefreshRequest>) -> ApiResult<Json<RefreshResponse>> {
    let access_token = state.auth.refresh(&body.refresh_token).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(RefreshResponse { access_token }))
}

pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Json<MeResponse>> {
    let user = state
        .rbac
        .find_by_id(principal.user_id)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?
        .ok_or_else(|| ApiError(AppError::Authentication("user no longer exists".into())))?;
    let role_name = role_name(&state, user.role_id).await.map_err(ApiError)?;
    let permissions = state
        .rbac
        .permissions_for_user(principal.user_id, user.role_id)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;

    Ok(Json(MeResponse {
        profile: UserProfile::new(&user, role_name),
        permissions: permissions.into_iter().map(|p| p.name).collect(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiOk>> {
    let user = state
        .rbac
        .find_by_id(principal.user_id)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?
        .ok_or_else(|| ApiError(AppError::Authentication("user no longer exists".into())))?;

    let valid = tsa_auth::password::verify(&body.current_password, &user.password_hash)
        .map_err(AppError::from)
        .map_err(ApiError)?;
    if !valid {
        return Err(ApiError(AppError::Authentication("current password is incorrect".into())));
    }

    state.auth.change_password(principal.user_id, &body.new_password).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}

pub async fn force_change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ForceChangePasswordRequest>,
) -> ApiResult<Json<ApiOk>> {
    state
        .auth
        .force_change_password(principal.user_id, &body.new_password)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}

/// Always returns a generic success, whether or not the address is
/// registered, so the response never leaks which emails exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<ApiOk>> {
    state.auth.request_password_reset(&body.email).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Json<ApiOk>> {
    state
        .auth
        .confirm_password_reset(&body.token, &body.new_password)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}

pub async fn verify_email(State(state): State<AppState>, Json(body): Json<VerifyEmailRequest>) -> ApiResult<Json<ApiOk>> {
    state.auth.verify_email(&body.token).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserListResponse>> {
    let users = state.rbac.list_users(200, 0).await.map_err(AppError::from).map_err(ApiError)?;
    let mut profiles = Vec::with_capacity(users.len());
    for user in &users {
        let role_name = role_name(&state, user.role_id).await.map_err(ApiError)?;
        profiles.push(UserProfile::new(user, role_name));
    }
    Ok(Json(UserListResponse { users: profiles }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<ApiOk>> {
    let status: Option<UserStatus> = body.status;
    let user_id = UserId(user_id);
    state
        .rbac
        .update_user(user_id, body.role_id.map(RoleId), status)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;
    state.auth.invalidate_permissions(user_id);
    Ok(Json(ApiOk::default()))
}

pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<RoleListResponse>> {
    let roles = state.rbac.list_roles().await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(RoleListResponse { roles }))
}

pub async fn create_role(
    State(state): State<AppState>,
    Json(body): Json<CreateRoleRequest>,
) -> ApiResult<Json<tsa_core::domain::Role>> {
    let role = state
        .rbac
        .create_role(&body.name, body.description.as_deref())
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;
    Ok(Json(role))
}
