// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{AppointmentError, AvailabilityResponse};

pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Read-only overlap check against the day's non-deleted appointments.
pub struct AvailabilityService {
    db: Arc<PostgrestClient>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: Arc::new(PostgrestClient::new(config)),
        }
    }

    /// Point-in-time rule: an existing appointment conflicts with the
    /// requested `[hour, hour+duration)` window only when its own hour falls
    /// strictly inside it. Boundary equality on either side is not a
    /// conflict, and the existing appointment's duration is ignored. Use
    /// [`check_availability_assuming_duration`] for the interval-aware
    /// variant.
    ///
    /// [`check_availability_assuming_duration`]: Self::check_availability_assuming_duration
    pub async fn check_availability(
        &self,
        date: NaiveDate,
        hour: NaiveTime,
        duration_minutes: i64,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let end = requested_window_end(date, hour, duration_minutes)?;
        debug!(
            "Checking availability on {} for [{}, {})",
            date, hour, end
        );

        let path = format!(
            "/rest/v1/appointments?appointment_date=eq.{}&deleted_at=is.null&hour=gt.{}&hour=lt.{}",
            date.format("%Y-%m-%d"),
            hour.format("%H:%M:%S"),
            end.format("%H:%M:%S"),
        );

        let (_, conflicting) = self
            .db
            .request_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(AvailabilityResponse {
            is_available: conflicting == 0,
            conflicting_appointments: conflicting,
        })
    }

    /// Interval-aware variant: treats each existing appointment as occupying
    /// `[hour, hour + assumed_minutes)` and reports any overlap with the
    /// requested window. Explicit opt-in, never the default.
    pub async fn check_availability_assuming_duration(
        &self,
        date: NaiveDate,
        hour: NaiveTime,
        duration_minutes: i64,
        assumed_minutes: i64,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let end = requested_window_end(date, hour, duration_minutes)?;
        if assumed_minutes < 1 {
            return Err(AppointmentError::Validation(
                "assume_existing_minutes must be at least 1".to_string(),
            ));
        }

        let path = format!(
            "/rest/v1/appointments?appointment_date=eq.{}&deleted_at=is.null",
            date.format("%Y-%m-%d"),
        );
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let conflicting = rows
            .iter()
            .filter_map(|row| row.get("hour").and_then(Value::as_str))
            .filter_map(|h| h.parse::<NaiveTime>().ok())
            .filter(|existing| intervals_overlap(*existing, assumed_minutes, hour, end))
            .count() as i64;

        Ok(AvailabilityResponse {
            is_available: conflicting == 0,
            conflicting_appointments: conflicting,
        })
    }
}

fn requested_window_end(
    date: NaiveDate,
    hour: NaiveTime,
    duration_minutes: i64,
) -> Result<NaiveTime, AppointmentError> {
    if duration_minutes < 1 {
        return Err(AppointmentError::Validation(
            "duration_minutes must be at least 1".to_string(),
        ));
    }
    Ok((date.and_time(hour) + Duration::minutes(duration_minutes)).time())
}

/// Point-in-time conflict rule, kept for parity with the store predicate.
pub fn conflicts_with_window(existing: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    existing > start && existing < end
}

fn intervals_overlap(
    existing_start: NaiveTime,
    existing_minutes: i64,
    start: NaiveTime,
    end: NaiveTime,
) -> bool {
    let existing_end = existing_start + Duration::minutes(existing_minutes);
    existing_start < end && existing_end > start
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn appointment_inside_the_window_conflicts() {
        assert!(conflicts_with_window(t("10:30:00"), t("10:00:00"), t("11:00:00")));
    }

    #[test]
    fn boundary_hours_do_not_conflict() {
        // At exactly the requested end...
        assert!(!conflicts_with_window(t("11:00:00"), t("10:00:00"), t("11:00:00")));
        // ...or exactly the requested start.
        assert!(!conflicts_with_window(t("10:00:00"), t("10:00:00"), t("11:00:00")));
    }

    #[test]
    fn window_end_comes_from_the_duration() {
        let date: NaiveDate = "2025-03-10".parse().unwrap();
        assert_eq!(
            requested_window_end(date, t("10:00:00"), 90).unwrap(),
            t("11:30:00")
        );
    }

    #[test]
    fn zero_duration_is_rejected() {
        let date: NaiveDate = "2025-03-10".parse().unwrap();
        assert!(requested_window_end(date, t("10:00:00"), 0).is_err());
    }

    #[test]
    fn interval_variant_catches_earlier_appointments_running_into_the_window() {
        // Existing 09:30 appointment assumed to last 60 minutes reaches into
        // a [10:00, 11:00) request; the point rule would miss it.
        assert!(!conflicts_with_window(t("09:30:00"), t("10:00:00"), t("11:00:00")));
        assert!(intervals_overlap(t("09:30:00"), 60, t("10:00:00"), t("11:00:00")));
    }

    #[test]
    fn interval_variant_respects_half_open_bounds() {
        // Ends exactly at the requested start: no overlap.
        assert!(!intervals_overlap(t("09:00:00"), 60, t("10:00:00"), t("11:00:00")));
        // Starts exactly at the requested end: no overlap.
        assert!(!intervals_overlap(t("11:00:00"), 60, t("10:00:00"), t("11:00:00")));
    }
}
