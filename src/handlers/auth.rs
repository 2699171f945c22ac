// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    extract::AppJson,
    models::user::{
        LoginRequest, LoginUser, NewUser, Role, SignupRequest, SignupUser, UpdateProfileRequest,
    },
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{CurrentUser, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. Accounts always
/// start with the `user` role.
/// Returns 201 Created and the public user fields.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let user = state
        .users
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            username: payload.username,
            password_hash,
            role: Role::User,
            bio: String::new(),
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": SignupUser::from(&user),
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// `username` may hold either the handle or the email. Unknown accounts,
/// wrong passwords and deactivated accounts all fail with 401.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .users
        .find_by_login(&payload.username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    if !user.is_active {
        return Err(AppError::AuthError("Account is deactivated".to_string()));
    }

    let token = sign_jwt(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": LoginUser::from(&user),
    })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Partial profile update: only supplied fields change.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let user = state
        .users
        .update_profile(current.id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}
