// libs/access-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AccessError, AssignPermissionRequest, CreateRoleRequest, UpdateRoleRequest};
use crate::services::role::RoleService;

fn to_app_error(e: AccessError) -> AppError {
    match e {
        AccessError::MissingField(field) => AppError::MissingField(field.to_string()),
        AccessError::RoleNotFound => AppError::NotFound("Role not found".to_string()),
        AccessError::PermissionNotFound => AppError::NotFound("Permission not found".to_string()),
        AccessError::Database(msg) => AppError::Database(msg),
    }
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Auth(
            "Only administrators may manage roles and permissions".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn list_roles(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = RoleService::new(&state);
    let roles = service.list_roles(auth.token()).await.map_err(to_app_error)?;

    Ok(Json(json!({ "results": roles })))
}

#[axum::debug_handler]
pub async fn get_role(
    State(state): State<Arc<AppConfig>>,
    Path(role_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = RoleService::new(&state);
    let role = service
        .get_role(role_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(role)))
}

#[axum::debug_handler]
pub async fn create_role(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::MissingField("name".to_string()))?;

    let service = RoleService::new(&state);
    let role = service
        .create_role(name, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Role created",
        "role": role
    })))
}

#[axum::debug_handler]
pub async fn update_role(
    State(state): State<Arc<AppConfig>>,
    Path(role_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::MissingField("name".to_string()))?;

    let service = RoleService::new(&state);
    let role = service
        .update_role(role_id, name, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Role updated",
        "role": role
    })))
}

#[axum::debug_handler]
pub async fn delete_role(
    State(state): State<Arc<AppConfig>>,
    Path(role_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = RoleService::new(&state);
    service
        .soft_delete_role(role_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Role deleted"
    })))
}

#[axum::debug_handler]
pub async fn list_permissions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = RoleService::new(&state);
    let permissions = service
        .list_permissions(auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({ "results": permissions })))
}

#[axum::debug_handler]
pub async fn assign_permission(
    State(state): State<Arc<AppConfig>>,
    Path(role_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AssignPermissionRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let permission_id = request
        .permission
        .ok_or_else(|| AppError::MissingField("permission".to_string()))?;

    let service = RoleService::new(&state);
    let assignment = service
        .assign_permission(role_id, permission_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Permission assigned",
        "assignment": assignment
    })))
}

#[axum::debug_handler]
pub async fn role_permissions(
    State(state): State<Arc<AppConfig>>,
    Path(role_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = RoleService::new(&state);
    let assignments = service
        .role_permissions(role_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({ "results": assignments })))
}
