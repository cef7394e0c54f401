// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentFilters, AvailabilityQuery, CreateAppointmentRequest,
    CreateStatusRequest, DateRangeQuery, UpdateAppointmentRequest,
};
use crate::services::appointment::AppointmentService;
use crate::services::availability::{AvailabilityService, DEFAULT_DURATION_MINUTES};
use crate::services::query::AppointmentQueryService;
use crate::services::status::StatusService;

#[derive(Debug, Deserialize)]
pub struct GetAppointmentQuery {
    pub include_deleted: Option<bool>,
}

fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::MissingField(field) => AppError::MissingField(field.to_string()),
        AppointmentError::Validation(msg) => AppError::ValidationError(msg),
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::TicketNotCreated => {
            AppError::Internal("Ticket was not created for the appointment".to_string())
        }
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// WRITE PATH
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let created = service
        .create(request, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Appointment created with ticket",
        "appointment": created.appointment,
        "ticket_number": created.ticket_number
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if request.is_empty() {
        return Err(AppError::ValidationError(
            "At least one field must be provided".to_string(),
        ));
    }

    let service = AppointmentService::new(&state);

    let appointment = service
        .update(appointment_id, request, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Appointment updated",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    service
        .soft_delete(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Appointment deleted"
    })))
}

// ==============================================================================
// READ PATH
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<GetAppointmentQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let include_deleted = query.include_deleted.unwrap_or(false);
    if include_deleted && !user.is_admin() {
        return Err(AppError::Auth(
            "Only administrators may view deleted appointments".to_string(),
        ));
    }

    let service = AppointmentService::new(&state);
    let appointment = service
        .get(appointment_id, include_deleted, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<AppointmentFilters>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentQueryService::new(&state);

    let page = service
        .list_appointments(&filters, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_completed_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<AppointmentFilters>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentQueryService::new(&state);

    let page = service
        .completed_appointments(&filters, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_pending_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<AppointmentFilters>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentQueryService::new(&state);

    let page = service
        .pending_appointments(&filters, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_appointments_in_range(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DateRangeQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if query.end_date < query.start_date {
        return Err(AppError::ValidationError(
            "end_date must not precede start_date".to_string(),
        ));
    }

    let filters = AppointmentFilters {
        appointment_status: query.appointment_status,
        patient: query.patient,
        therapist: query.therapist,
        ..Default::default()
    };

    let service = AppointmentQueryService::new(&state);
    let page = service
        .appointments_in_range(query.start_date, query.end_date, &filters, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailabilityQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let duration = query.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);

    let availability = match query.assume_existing_minutes {
        Some(assumed) => {
            service
                .check_availability_assuming_duration(
                    query.date,
                    query.hour,
                    duration,
                    assumed,
                    auth.token(),
                )
                .await
        }
        None => {
            service
                .check_availability(query.date, query.hour, duration, auth.token())
                .await
        }
    }
    .map_err(to_app_error)?;

    Ok(Json(json!(availability)))
}

// ==============================================================================
// STATUS CATALOG
// ==============================================================================

#[axum::debug_handler]
pub async fn list_statuses(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = StatusService::new(&state);
    let statuses = service.list(auth.token()).await.map_err(to_app_error)?;

    Ok(Json(json!({ "results": statuses })))
}

#[axum::debug_handler]
pub async fn create_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth(
            "Only administrators may manage statuses".to_string(),
        ));
    }

    let service = StatusService::new(&state);
    let status = service
        .create(request, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "message": "Status created",
        "status": status
    })))
}
