// src/handlers/admin.rs

//! Account administration. Mounted behind `auth_middleware` + `admin_middleware`.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::user::{ChangeRoleRequest, Role},
    query::{PageParams, UserPagination},
    state::AppState,
    utils::jwt::CurrentUser,
};

/// Lists accounts, newest first.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page_request();
    let (users, total) = state.users.list_users(&page).await?;
    let pagination = UserPagination::new(&page, users.len(), total);

    Ok(Json(json!({
        "users": users,
        "pagination": pagination,
    })))
}

/// Flips `isActive`. Prevents deactivating self.
pub async fn toggle_user_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == current.id {
        return Err(AppError::BadRequest(
            "Cannot change your own account status".to_string(),
        ));
    }

    let user = state
        .users
        .toggle_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let verb = if user.is_active { "activated" } else { "deactivated" };
    tracing::info!(admin_id = current.id, user_id = id, "User {}", verb);

    Ok(Json(json!({
        "message": format!("User {verb} successfully"),
        "user": user,
    })))
}

/// Sets the role to `user` or `admin`. Prevents changing own role.
pub async fn change_user_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role: Role = payload
        .role
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid role: expected user or admin".to_string()))?;

    if id == current.id {
        return Err(AppError::BadRequest("Cannot change your own role".to_string()));
    }

    let user = state
        .users
        .set_role(id, role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = current.id, user_id = id, role = role.as_str(), "User role changed");

    Ok(Json(json!({
        "message": "User role updated successfully",
        "user": user,
    })))
}
