// libs/access-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
}

/// Unique (role, permission) assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleHasPermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignPermissionRequest {
    pub permission: Option<Uuid>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    #[error("The field {0} is required")]
    MissingField(&'static str),

    #[error("Role not found")]
    RoleNotFound,

    #[error("Permission not found")]
    PermissionNotFound,

    #[error("Database error: {0}")]
    Database(String),
}
