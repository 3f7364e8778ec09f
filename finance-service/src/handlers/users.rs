use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;

use crate::dtos::{ApproveUserRequest, LoginRequest, LoginResponse, RegisterRequest, UserEmailRequest};
use crate::models::{User, UserResponse, UserStatus};
use crate::services::{RoleLookup, ServiceError};
use crate::utils::password::{
    hash_password_blocking, verify_password_blocking, Password, PasswordHashString,
};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// New users start inactive and without a role until an administrator
/// approves them.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state
        .db
        .find_user_by_email_including_deleted(&req.email)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict("Email already exists".to_string()).into());
    }
    if req.password != req.confirm_pass {
        return Err(ServiceError::Validation(
            "Your new password is not equal to confirm password.".to_string(),
        )
        .into());
    }

    let hash = hash_password_blocking(Password::new(req.password)).await?;
    let user = User::new(req.name, req.email, hash.into_string());
    state.db.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": true,
            "message": "User created successfully",
            "user": user.sanitized(),
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Email not found!".to_string()))?;

    if user.status == UserStatus::Inactive {
        return Err(ServiceError::InactiveUser.into());
    }

    let matches = verify_password_blocking(
        Password::new(req.password),
        PasswordHashString::new(user.password_hash.clone()),
    )
    .await?;
    if !matches {
        tracing::info!(user_id = %user.id, "Login failed: password mismatch");
        return Err(
            ServiceError::InvalidCredentials("Email and password may be incorrect!".to_string())
                .into(),
        );
    }

    let role = match user.role_id.as_deref() {
        Some(role_id) => state.roles.find_role_by_id(role_id).await?.map(|r| r.name),
        None => None,
    };

    let token = state.jwt.issue(&user.id, &user.email, &user.name)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        status: true,
        message: "Login successfully".to_string(),
        token,
        name: user.name,
        role,
    }))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.db.list_users().await?;
    if users.is_empty() {
        return Err(ServiceError::NotFound("No users are registered".to_string()).into());
    }
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(json!({
        "status": true,
        "message": "Users fetched successfully",
        "users": users,
    })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_id(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No user found".to_string()))?;
    Ok(Json(json!({
        "status": true,
        "message": "User fetched successfully",
        "user": user.sanitized(),
    })))
}

/// Assigns the named role and activates the user.
pub async fn approve_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ApproveUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.find_user_by_email(&req.email).await?.is_none() {
        return Err(ServiceError::NotFound("Email not found!".to_string()).into());
    }
    let role = state
        .roles
        .find_role_by_name(&req.user_role)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Role not found".to_string()))?;

    if !state.db.approve_user(&req.email, &role.id).await? {
        return Err(ServiceError::NotFound("Email not found!".to_string()).into());
    }

    tracing::info!(role = %role.name, "User approved");
    Ok(Json(json!({
        "status": true,
        "message": "User approved successfully",
    })))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UserEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    change_status(&state, &req.email, UserStatus::Inactive).await?;
    Ok(Json(json!({
        "status": true,
        "message": "User deactivated successfully",
    })))
}

pub async fn activate_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UserEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    change_status(&state, &req.email, UserStatus::Active).await?;
    Ok(Json(json!({
        "status": true,
        "message": "User activated successfully",
    })))
}

async fn change_status(state: &AppState, email: &str, status: UserStatus) -> Result<(), AppError> {
    if !state.db.set_user_status(email, status).await? {
        return Err(ServiceError::NotFound("Email not found!".to_string()).into());
    }
    tracing::info!(status = status.as_str(), "User status changed");
    Ok(())
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.soft_delete_user(&id).await? {
        return Err(ServiceError::NotFound("User not found!".to_string()).into());
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(Json(json!({
        "status": true,
        "message": "User deleted successfully",
    })))
}
