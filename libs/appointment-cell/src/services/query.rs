// libs/appointment-cell/src/services/query.rs
use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilters, AppointmentPage, AppointmentStatus,
    StatusClass,
};

/// Translates a filter bag into entity-store predicates. Pure read path: the
/// engine owns no data and performs no writes.
pub struct AppointmentQueryService {
    db: Arc<PostgrestClient>,
    tz: Option<FixedOffset>,
}

impl AppointmentQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: Arc::new(PostgrestClient::new(config)),
            tz: config.time_zone(),
        }
    }

    /// List non-deleted appointments matching the equality filters, with
    /// optional pagination. The count always reflects the filtered set
    /// before the slice.
    pub async fn list_appointments(
        &self,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing appointments with filters: {:?}", filters);

        let mut parts = vec!["deleted_at=is.null".to_string()];
        push_equality_filters(&mut parts, filters, true);

        if let Some(pagination) = filters.pagination() {
            parts.push(format!("limit={}", pagination.limit()));
            parts.push(format!("offset={}", pagination.offset()));
        }

        self.fetch_page(&parts, auth_token).await
    }

    /// Completed view: caller-supplied status wins, otherwise the canonical
    /// `completed` status class, otherwise a date-before-today heuristic.
    /// Ordering (date desc, hour desc) is layered on only when paginating.
    pub async fn completed_appointments(
        &self,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing completed appointments with filters: {:?}", filters);

        let mut parts = vec!["deleted_at=is.null".to_string()];

        if let Some(status) = filters.appointment_status {
            parts.push(format!("appointment_status_id=eq.{}", status));
        } else if let Some(status_id) = self
            .resolve_status_by_class(StatusClass::Completed, auth_token)
            .await?
        {
            parts.push(format!("appointment_status_id=eq.{}", status_id));
        } else {
            let today = today_in(self.tz);
            warn!("No completed status row found, falling back to appointment_date < {}", today);
            parts.push(format!("appointment_date=lt.{}", today.format("%Y-%m-%d")));
        }

        push_equality_filters(&mut parts, filters, false);

        if let Some(window) = resolve_date_window(filters) {
            if let Some(start) = window.start {
                parts.push(format!(
                    "appointment_date=gte.{}",
                    urlencoding::encode(&format_bound(start, self.tz))
                ));
            }
            if let Some(end) = window.end {
                parts.push(format!(
                    "appointment_date=lt.{}",
                    urlencoding::encode(&format_bound(end, self.tz))
                ));
            }
        }

        if let Some(pagination) = filters.pagination() {
            parts.push("order=appointment_date.desc,hour.desc".to_string());
            parts.push(format!("limit={}", pagination.limit()));
            parts.push(format!("offset={}", pagination.offset()));
        }

        self.fetch_page(&parts, auth_token).await
    }

    /// Pending view: mirrors the completed view with the `pending` class and
    /// an on-or-after-today fallback. No window, no pagination.
    pub async fn pending_appointments(
        &self,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing pending appointments with filters: {:?}", filters);

        let mut parts = vec!["deleted_at=is.null".to_string()];

        if let Some(status) = filters.appointment_status {
            parts.push(format!("appointment_status_id=eq.{}", status));
        } else if let Some(status_id) = self
            .resolve_status_by_class(StatusClass::Pending, auth_token)
            .await?
        {
            parts.push(format!("appointment_status_id=eq.{}", status_id));
        } else {
            let today = today_in(self.tz);
            warn!("No pending status row found, falling back to appointment_date >= {}", today);
            parts.push(format!("appointment_date=gte.{}", today.format("%Y-%m-%d")));
        }

        push_equality_filters(&mut parts, filters, false);

        self.fetch_page(&parts, auth_token).await
    }

    /// Appointments whose calendar date falls inside the inclusive range.
    pub async fn appointments_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing appointments between {} and {}", start_date, end_date);

        let mut parts = vec![
            "deleted_at=is.null".to_string(),
            format!("appointment_date=gte.{}", start_date.format("%Y-%m-%d")),
            format!("appointment_date=lte.{}", end_date.format("%Y-%m-%d")),
        ];
        push_equality_filters(&mut parts, filters, true);

        self.fetch_page(&parts, auth_token).await
    }

    async fn resolve_status_by_class(
        &self,
        class: StatusClass,
        auth_token: &str,
    ) -> Result<Option<uuid::Uuid>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointment_statuses?class=eq.{}&deleted_at=is.null&limit=1",
            class
        );
        let rows: Vec<AppointmentStatus> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(rows.first().map(|s| s.id))
    }

    async fn fetch_page(
        &self,
        parts: &[String],
        auth_token: &str,
    ) -> Result<AppointmentPage, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", parts.join("&"));

        let (rows, count) = self
            .db
            .request_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let results = parse_appointments(rows)?;
        Ok(AppointmentPage { count, results })
    }
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppointmentError::Database(format!("Failed to parse appointments: {}", e)))
}

fn push_equality_filters(parts: &mut Vec<String>, filters: &AppointmentFilters, with_status: bool) {
    if let Some(date) = filters.appointment_date {
        parts.push(format!("appointment_date=eq.{}", date.format("%Y-%m-%d")));
    }
    if with_status {
        if let Some(status) = filters.appointment_status {
            parts.push(format!("appointment_status_id=eq.{}", status));
        }
    }
    if let Some(patient) = filters.patient {
        parts.push(format!("patient_id=eq.{}", patient));
    }
    if let Some(therapist) = filters.therapist {
        parts.push(format!("therapist_id=eq.{}", therapist));
    }
}

/// Half-open datetime window over the appointment date, local to the
/// configured zone. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Precedence: single `date` wins over the start/end pair; a lone bound
/// leaves the other side open. Returns `None` when no date key is supplied.
pub fn resolve_date_window(filters: &AppointmentFilters) -> Option<DateWindow> {
    let day_start = |d: NaiveDate| d.and_time(NaiveTime::MIN);

    if let Some(date) = filters.date {
        let start = day_start(date);
        return Some(DateWindow {
            start: Some(start),
            end: Some(start + Duration::days(1)),
        });
    }

    match (filters.start_date, filters.end_date) {
        (Some(start), Some(end)) => Some(DateWindow {
            start: Some(day_start(start)),
            end: Some(day_start(end) + Duration::days(1)),
        }),
        (Some(start), None) => Some(DateWindow {
            start: Some(day_start(start)),
            end: None,
        }),
        (None, Some(end)) => Some(DateWindow {
            start: None,
            end: Some(day_start(end) + Duration::days(1)),
        }),
        (None, None) => None,
    }
}

/// Render a window bound for the store: offset-aware RFC 3339 when a zone is
/// configured, an unzoned timestamp otherwise.
pub fn format_bound(bound: NaiveDateTime, tz: Option<FixedOffset>) -> String {
    match tz.and_then(|tz| bound.and_local_timezone(tz).single()) {
        Some(zoned) => zoned.to_rfc3339_opts(SecondsFormat::Secs, false),
        None => bound.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

/// Current calendar date in the configured zone, UTC when unzoned.
pub fn today_in(tz: Option<FixedOffset>) -> NaiveDate {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Utc::now().date_naive(),
    }
}
