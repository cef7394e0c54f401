// libs/appointment-cell/src/services/status.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{AppointmentError, AppointmentStatus, CreateStatusRequest};

/// Catalog of appointment statuses. Rows are conventional, not guaranteed:
/// the query engine always tolerates an empty catalog.
pub struct StatusService {
    db: Arc<PostgrestClient>,
}

impl StatusService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: Arc::new(PostgrestClient::new(config)),
        }
    }

    pub async fn list(&self, auth_token: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        debug!("Listing appointment statuses");

        let rows: Vec<AppointmentStatus> = self
            .db
            .request(
                Method::GET,
                "/rest/v1/appointment_statuses?deleted_at=is.null&order=name.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(rows)
    }

    pub async fn create(
        &self,
        request: CreateStatusRequest,
        auth_token: &str,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppointmentError::MissingField("name"));
        }

        let status_data = json!({
            "name": name,
            "class": request.class,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointment_statuses",
                Some(auth_token),
                Some(status_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = result
            .first()
            .ok_or_else(|| AppointmentError::Database("Failed to create status".to_string()))?;
        serde_json::from_value(row.clone())
            .map_err(|e| AppointmentError::Database(format!("Failed to parse status: {}", e)))
    }
}
