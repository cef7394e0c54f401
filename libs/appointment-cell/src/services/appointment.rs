// libs/appointment-cell/src/services/appointment.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    Appointment, AppointmentError, CreateAppointmentRequest, CreatedAppointment,
    UpdateAppointmentRequest,
};

/// Write path for appointments and their companion tickets. Create and
/// soft-delete keep the appointment/ticket pair in lockstep; atomicity of
/// the pair is delegated to the store.
pub struct AppointmentService {
    db: Arc<PostgrestClient>,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: Arc::new(PostgrestClient::new(config)),
        }
    }

    /// Create an appointment and, as an explicit second step, its ticket.
    /// An empty ticket insert result is an internal error: every active
    /// appointment must have exactly one ticket.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<CreatedAppointment, AppointmentError> {
        let patient = request.patient.ok_or(AppointmentError::MissingField("patient"))?;
        let appointment_date = request
            .appointment_date
            .ok_or(AppointmentError::MissingField("appointment_date"))?;
        let hour = request.hour.ok_or(AppointmentError::MissingField("hour"))?;

        let now = Utc::now();
        let appointment_data = json!({
            "patient_id": patient,
            "therapist_id": request.therapist,
            "appointment_date": appointment_date.format("%Y-%m-%d").to_string(),
            "hour": hour.format("%H:%M:%S").to_string(),
            "appointment_status_id": request.appointment_status,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointment: Appointment = result
            .first()
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AppointmentError::Database(format!("Failed to parse created appointment: {}", e)))?
            .ok_or_else(|| AppointmentError::Database("Failed to create appointment".to_string()))?;

        let ticket_number = generate_ticket_number(appointment_date);
        let ticket_data = json!({
            "appointment_id": appointment.id,
            "ticket_number": ticket_number,
            "created_at": now.to_rfc3339()
        });

        let ticket_result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/tickets",
                Some(auth_token),
                Some(ticket_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        if ticket_result.is_empty() {
            return Err(AppointmentError::TicketNotCreated);
        }

        info!(
            "Appointment {} created with ticket {}",
            appointment.id, ticket_number
        );

        Ok(CreatedAppointment {
            appointment,
            ticket_number,
        })
    }

    /// Fetch by id. Soft-deleted rows are excluded unless `include_deleted`
    /// is set (administrative recovery).
    pub async fn get(
        &self,
        appointment_id: Uuid,
        include_deleted: bool,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let mut path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        if !include_deleted {
            path.push_str("&deleted_at=is.null");
        }

        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = result.first().ok_or(AppointmentError::NotFound)?;
        serde_json::from_value(row.clone())
            .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e)))
    }

    /// Partial update by id; only non-deleted rows. A missing row is
    /// NotFound, never a validation failure.
    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        // Distinguishes not-found from a store-level patch miss.
        self.get(appointment_id, false, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(patient) = request.patient {
            update_data.insert("patient_id".to_string(), json!(patient));
        }
        if let Some(therapist) = request.therapist {
            update_data.insert("therapist_id".to_string(), json!(therapist));
        }
        if let Some(date) = request.appointment_date {
            update_data.insert(
                "appointment_date".to_string(),
                json!(date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(hour) = request.hour {
            update_data.insert("hour".to_string(), json!(hour.format("%H:%M:%S").to_string()));
        }
        if let Some(status) = request.appointment_status {
            update_data.insert("appointment_status_id".to_string(), json!(status));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&deleted_at=is.null",
            appointment_id
        );
        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = result
            .first()
            .ok_or_else(|| AppointmentError::Database("Failed to update appointment".to_string()))?;
        serde_json::from_value(row.clone()).map_err(|e| {
            AppointmentError::Database(format!("Failed to parse updated appointment: {}", e))
        })
    }

    /// Soft delete: stamp `deleted_at` and cascade the stamp to the
    /// appointment's non-deleted ticket. No ticket is not an error.
    pub async fn soft_delete(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Soft-deleting appointment {}", appointment_id);

        self.get(appointment_id, false, auth_token).await?;

        let deleted_at = json!({ "deleted_at": Utc::now().to_rfc3339() });

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&deleted_at=is.null",
            appointment_id
        );
        let _: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(deleted_at.clone()),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let ticket_path = format!(
            "/rest/v1/tickets?appointment_id=eq.{}&deleted_at=is.null",
            appointment_id
        );
        let cascaded: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &ticket_path,
                Some(auth_token),
                Some(deleted_at),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        info!(
            "Appointment {} soft-deleted ({} ticket(s) cascaded)",
            appointment_id,
            cascaded.len()
        );
        Ok(())
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

/// `TKT-YYYYMMDD-XXXXXX`, unique enough per day for front-desk use; the
/// store holds the unique constraint.
fn generate_ticket_number(date: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("TKT-{}-{}", date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_numbers_carry_the_date_and_a_suffix() {
        let date: NaiveDate = "2025-03-10".parse().unwrap();
        let number = generate_ticket_number(date);
        assert!(number.starts_with("TKT-20250310-"));
        assert_eq!(number.len(), "TKT-20250310-".len() + 6);
        assert!(number
            .rsplit('-')
            .next()
            .unwrap()
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
