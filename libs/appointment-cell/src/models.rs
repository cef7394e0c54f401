// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub hour: NaiveTime,
    pub appointment_status_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// One-to-one companion record created alongside every appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub ticket_number: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Stable semantic tag on a status row. The completed/pending views key off
/// this tag, never off the display name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Completed,
    Pending,
    Other,
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusClass::Completed => write!(f, "completed"),
            StatusClass::Pending => write!(f, "pending"),
            StatusClass::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStatus {
    pub id: Uuid,
    pub name: String,
    pub class: StatusClass,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// The three required fields stay optional here so a missing one can be
/// reported by name instead of failing at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient: Option<Uuid>,
    pub therapist: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub hour: Option<NaiveTime>,
    pub appointment_status: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient: Option<Uuid>,
    pub therapist: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub hour: Option<NaiveTime>,
    pub appointment_status: Option<Uuid>,
}

impl UpdateAppointmentRequest {
    pub fn is_empty(&self) -> bool {
        self.patient.is_none()
            && self.therapist.is_none()
            && self.appointment_date.is_none()
            && self.hour.is_none()
            && self.appointment_status.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedAppointment {
    pub appointment: Appointment,
    pub ticket_number: String,
}

/// Optional, partially populated query constraints. All filters AND together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilters {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_status: Option<Uuid>,
    pub patient: Option<Uuid>,
    pub therapist: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AppointmentFilters {
    pub fn pagination(&self) -> Option<Pagination> {
        if self.page.is_none() && self.page_size.is_none() {
            return None;
        }
        Some(Pagination::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(10),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    // page and page_size are caller-supplied; the product can exceed u32.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// Listing result: `count` is the filtered total before any slice.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentPage {
    pub count: i64,
    pub results: Vec<Appointment>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub appointment_status: Option<Uuid>,
    pub patient: Option<Uuid>,
    pub therapist: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub hour: NaiveTime,
    pub duration_minutes: Option<i64>,
    /// Opt-in interval-aware overlap check: treat each existing appointment
    /// as lasting this many minutes instead of a single point in time.
    pub assume_existing_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub is_available: bool,
    pub conflicting_appointments: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStatusRequest {
    pub name: String,
    pub class: StatusClass,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("The field {0} is required")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Ticket was not created for the appointment")]
    TicketNotCreated,

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_slices_from_page_one() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn pagination_offset_survives_huge_query_params() {
        let p = Pagination::new(u32::MAX, 1000);
        assert_eq!(p.offset(), (u64::from(u32::MAX) - 1) * 1000);
    }

    #[test]
    fn pagination_clamps_to_one() {
        let p = Pagination::new(0, 0);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn filters_without_page_keys_have_no_pagination() {
        let filters = AppointmentFilters::default();
        assert!(filters.pagination().is_none());

        let filters = AppointmentFilters {
            page_size: Some(5),
            ..Default::default()
        };
        assert_eq!(filters.pagination(), Some(Pagination::new(1, 5)));
    }

    #[test]
    fn status_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StatusClass::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(StatusClass::Pending.to_string(), "pending");
    }
}
