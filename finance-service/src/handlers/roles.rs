use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;

use crate::dtos::CreateRoleRequest;
use crate::models::{Role, RoleResponse};
use crate::services::error::ROLE_EXISTS;
use crate::services::{RoleLookup, ServiceError};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let roles = state.db.list_roles().await?;
    if roles.is_empty() {
        return Err(ServiceError::NotFound("No roles are found".to_string()).into());
    }
    Ok(Json(json!({
        "status": true,
        "message": "Roles fetched successfully",
        "roles": roles.into_iter().map(RoleResponse::from).collect::<Vec<_>>(),
    })))
}

pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let role = state
        .roles
        .find_role_by_id(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No role found".to_string()))?;
    Ok(Json(json!({
        "status": true,
        "message": "Role fetched successfully",
        "role": RoleResponse::from(role),
    })))
}

pub async fn add_role(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.roles.find_role_by_name(&req.name).await?.is_some() {
        return Err(ServiceError::Conflict(ROLE_EXISTS.to_string()).into());
    }
    if req.permissions.is_empty() {
        return Err(ServiceError::Validation("No permissions are defined".to_string()).into());
    }

    let role = Role::new(req.name, req.permissions);
    state.db.insert_role(&role).await?;
    tracing::info!(role_id = %role.id, role = %role.name, "Role created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": true,
            "message": "Role created successfully",
            "role": RoleResponse::from(role),
        })),
    ))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.soft_delete_role(&id).await? {
        return Err(ServiceError::NotFound("Role not found!".to_string()).into());
    }
    tracing::info!(role_id = %id, "Role deleted");
    Ok(Json(json!({
        "status": true,
        "message": "Role deleted successfully",
    })))
}
