use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assert_matches::assert_matches;

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn auth_header(config: &TestConfig, user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &config.jwt_secret, None);
    TypedHeader(Authorization::bearer(&token).unwrap())
}

fn user_extension(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

fn appointment_row(id: Uuid, date: &str, hour: &str) -> serde_json::Value {
    json!({
        "id": id,
        "patient_id": Uuid::new_v4(),
        "therapist_id": null,
        "appointment_date": date,
        "hour": hour,
        "appointment_status_id": null,
        "deleted_at": null,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn create_appointment_returns_the_ticket_number() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([appointment_row(appointment_id, "2025-03-10", "10:00:00")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tickets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "appointment_id": appointment_id,
                "ticket_number": "TKT-20250310-A1B2C3",
                "deleted_at": null,
                "created_at": "2025-01-01T00:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let request = CreateAppointmentRequest {
        patient: Some(Uuid::new_v4()),
        therapist: Some(Uuid::new_v4()),
        appointment_date: Some("2025-03-10".parse().unwrap()),
        hour: Some("10:00:00".parse().unwrap()),
        appointment_status: None,
    };

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&config, &user),
        user_extension(&user),
        Json(request),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["message"], "Appointment created with ticket");
    assert!(body["ticket_number"]
        .as_str()
        .unwrap()
        .starts_with("TKT-20250310-"));
}

#[tokio::test]
async fn create_appointment_names_the_missing_field() {
    let config = TestConfig::default();
    let user = TestUser::default();

    let request = CreateAppointmentRequest {
        patient: None,
        therapist: None,
        appointment_date: Some("2025-03-10".parse().unwrap()),
        hour: Some("10:00:00".parse().unwrap()),
        appointment_status: None,
    };

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&config, &user),
        user_extension(&user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::MissingField(field)) if field == "patient");
}

#[tokio::test]
async fn update_appointment_rejects_an_empty_body() {
    let config = TestConfig::default();
    let user = TestUser::default();

    let result = update_appointment(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        auth_header(&config, &user),
        user_extension(&user),
        Json(UpdateAppointmentRequest::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn delete_appointment_cascades_to_the_ticket() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(appointment_id, "2025-03-10", "10:00:00")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(appointment_id, "2025-03-10", "10:00:00")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tickets"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "appointment_id": appointment_id,
                "ticket_number": "TKT-20250310-A1B2C3",
                "deleted_at": "2025-03-11T00:00:00Z",
                "created_at": "2025-01-01T00:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let result = delete_appointment(
        State(config.to_arc()),
        Path(appointment_id),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["message"], "Appointment deleted");
}

#[tokio::test]
async fn get_appointment_maps_missing_rows_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let result = get_appointment(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        Query(GetAppointmentQuery {
            include_deleted: None,
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn include_deleted_is_admin_only() {
    let config = TestConfig::default();
    let user = TestUser::new("desk@example.com", "receptionist");

    let result = get_appointment(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        Query(GetAppointmentQuery {
            include_deleted: Some(true),
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn admin_can_fetch_a_deleted_appointment() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    // Without the deleted_at predicate the soft-deleted row comes back.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": appointment_id,
                "patient_id": Uuid::new_v4(),
                "therapist_id": null,
                "appointment_date": "2025-03-10",
                "hour": "10:00:00",
                "appointment_status_id": null,
                "deleted_at": "2025-03-11T00:00:00Z",
                "created_at": "2025-01-01T00:00:00Z",
                "updated_at": "2025-01-01T00:00:00Z"
            }
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    let result = get_appointment(
        State(config.to_arc()),
        Path(appointment_id),
        Query(GetAppointmentQuery {
            include_deleted: Some(true),
        }),
        auth_header(&config, &admin),
        user_extension(&admin),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["id"], json!(appointment_id));
    assert!(!body["deleted_at"].is_null());
}

#[tokio::test]
async fn availability_reports_conflicts_inside_the_window() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2025-03-10"))
        .and(query_param("hour", "gt.10:00:00"))
        .and(query_param("hour", "lt.11:00:00"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/1")
                .set_body_json(json!([appointment_row(Uuid::new_v4(), "2025-03-10", "10:30:00")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let result = check_availability(
        State(config.to_arc()),
        Query(AvailabilityQuery {
            date: "2025-03-10".parse().unwrap(),
            hour: "10:00:00".parse().unwrap(),
            duration_minutes: None,
            assume_existing_minutes: None,
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["is_available"], json!(false));
    assert_eq!(body["conflicting_appointments"], json!(1));
}

#[tokio::test]
async fn availability_ignores_boundary_appointments() {
    let mock_server = MockServer::start().await;

    // An 11:00 appointment sits exactly on the end of a [10:00, 11:00)
    // request, so the strict gt/lt predicates exclude it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("hour", "gt.10:00:00"))
        .and(query_param("hour", "lt.11:00:00"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "*/0")
                .set_body_json(json!([])),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let result = check_availability(
        State(config.to_arc()),
        Query(AvailabilityQuery {
            date: "2025-03-10".parse().unwrap(),
            hour: "10:00:00".parse().unwrap(),
            duration_minutes: Some(60),
            assume_existing_minutes: None,
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["is_available"], json!(true));
}

#[tokio::test]
async fn interval_aware_availability_is_opt_in() {
    let mock_server = MockServer::start().await;

    // A 09:30 appointment assumed to last an hour reaches into the request.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2025-03-10"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(Uuid::new_v4(), "2025-03-10", "09:30:00")])),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let user = TestUser::default();

    let result = check_availability(
        State(config.to_arc()),
        Query(AvailabilityQuery {
            date: "2025-03-10".parse().unwrap(),
            hour: "10:00:00".parse().unwrap(),
            duration_minutes: Some(60),
            assume_existing_minutes: Some(60),
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["is_available"], json!(false));
    assert_eq!(body["conflicting_appointments"], json!(1));
}

#[tokio::test]
async fn create_status_is_admin_only() {
    let config = TestConfig::default();
    let user = TestUser::new("desk@example.com", "receptionist");

    let result = create_status(
        State(config.to_arc()),
        auth_header(&config, &user),
        user_extension(&user),
        Json(CreateStatusRequest {
            name: "Atendida".to_string(),
            class: StatusClass::Completed,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn range_endpoint_rejects_inverted_bounds() {
    let config = TestConfig::default();
    let user = TestUser::default();

    let result = get_appointments_in_range(
        State(config.to_arc()),
        Query(DateRangeQuery {
            start_date: "2025-03-05".parse().unwrap(),
            end_date: "2025-03-01".parse().unwrap(),
            appointment_status: None,
            patient: None,
            therapist: None,
        }),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}
