// libs/access-cell/src/services/role.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{AccessError, Permission, Role, RoleHasPermission};

pub struct RoleService {
    db: Arc<PostgrestClient>,
}

impl RoleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: Arc::new(PostgrestClient::new(config)),
        }
    }

    pub async fn list_roles(&self, auth_token: &str) -> Result<Vec<Role>, AccessError> {
        let rows: Vec<Role> = self
            .db
            .request(
                Method::GET,
                "/rest/v1/roles?deleted_at=is.null&order=name.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;
        Ok(rows)
    }

    pub async fn get_role(&self, role_id: Uuid, auth_token: &str) -> Result<Role, AccessError> {
        let path = format!("/rest/v1/roles?id=eq.{}&deleted_at=is.null", role_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;

        let row = rows.first().ok_or(AccessError::RoleNotFound)?;
        serde_json::from_value(row.clone())
            .map_err(|e| AccessError::Database(format!("Failed to parse role: {}", e)))
    }

    pub async fn create_role(&self, name: &str, auth_token: &str) -> Result<Role, AccessError> {
        debug!("Creating role {}", name);

        let body = json!({
            "name": name,
            "created_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/roles",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| AccessError::Database("Failed to create role".to_string()))?;
        serde_json::from_value(row.clone())
            .map_err(|e| AccessError::Database(format!("Failed to parse role: {}", e)))
    }

    pub async fn update_role(
        &self,
        role_id: Uuid,
        name: &str,
        auth_token: &str,
    ) -> Result<Role, AccessError> {
        self.get_role(role_id, auth_token).await?;

        let path = format!("/rest/v1/roles?id=eq.{}&deleted_at=is.null", role_id);
        let body = json!({ "name": name });

        let rows: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| AccessError::Database("Failed to update role".to_string()))?;
        serde_json::from_value(row.clone())
            .map_err(|e| AccessError::Database(format!("Failed to parse role: {}", e)))
    }

    pub async fn soft_delete_role(
        &self,
        role_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AccessError> {
        self.get_role(role_id, auth_token).await?;

        let path = format!("/rest/v1/roles?id=eq.{}&deleted_at=is.null", role_id);
        let body = json!({ "deleted_at": Utc::now().to_rfc3339() });

        let _: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;

        info!("Role {} soft-deleted", role_id);
        Ok(())
    }

    pub async fn list_permissions(&self, auth_token: &str) -> Result<Vec<Permission>, AccessError> {
        let rows: Vec<Permission> = self
            .db
            .request(
                Method::GET,
                "/rest/v1/permissions?order=name.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;
        Ok(rows)
    }

    /// Assign a permission to a role; already-assigned is a no-op.
    pub async fn assign_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        auth_token: &str,
    ) -> Result<RoleHasPermission, AccessError> {
        self.get_role(role_id, auth_token).await?;

        let permission_path = format!("/rest/v1/permissions?id=eq.{}", permission_id);
        let permissions: Vec<Value> = self
            .db
            .request(Method::GET, &permission_path, Some(auth_token), None)
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;
        if permissions.is_empty() {
            return Err(AccessError::PermissionNotFound);
        }

        let existing_path = format!(
            "/rest/v1/role_has_permissions?role_id=eq.{}&permission_id=eq.{}",
            role_id, permission_id
        );
        let existing: Vec<Value> = self
            .db
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;
        if let Some(row) = existing.first() {
            return serde_json::from_value(row.clone())
                .map_err(|e| AccessError::Database(format!("Failed to parse assignment: {}", e)));
        }

        let body = json!({
            "role_id": role_id,
            "permission_id": permission_id
        });
        let rows: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/role_has_permissions",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| AccessError::Database("Failed to assign permission".to_string()))?;
        serde_json::from_value(row.clone())
            .map_err(|e| AccessError::Database(format!("Failed to parse assignment: {}", e)))
    }

    pub async fn role_permissions(
        &self,
        role_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<RoleHasPermission>, AccessError> {
        self.get_role(role_id, auth_token).await?;

        let path = format!("/rest/v1/role_has_permissions?role_id=eq.{}", role_id);
        let rows: Vec<RoleHasPermission> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AccessError::Database(e.to_string()))?;
        Ok(rows)
    }
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}
