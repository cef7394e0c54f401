use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assert_matches::assert_matches;

use access_cell::handlers::*;
use access_cell::models::*;
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

fn role_row(id: Uuid, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "deleted_at": null,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn role_management_is_admin_only() {
    let config = TestConfig::default();
    let user = TestUser::new("desk@example.com", "receptionist");

    let result = list_roles(
        State(config.to_arc()),
        auth_header(&config, &user),
        user_extension(&user),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn create_role_requires_a_name() {
    let config = TestConfig::default();
    let admin = TestUser::admin("admin@example.com");

    let result = create_role(
        State(config.to_arc()),
        auth_header(&config, &admin),
        user_extension(&admin),
        Json(CreateRoleRequest {
            name: Some("   ".to_string()),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::MissingField(field)) if field == "name");
}

#[tokio::test]
async fn assigning_an_existing_permission_is_a_no_op() {
    let mock_server = MockServer::start().await;
    let role_id = Uuid::new_v4();
    let permission_id = Uuid::new_v4();
    let assignment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .and(query_param("id", format!("eq.{}", role_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([role_row(role_id, "receptionist")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/permissions"))
        .and(query_param("id", format!("eq.{}", permission_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": permission_id, "name": "appointments.read" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/role_has_permissions"))
        .and(query_param("role_id", format!("eq.{}", role_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": assignment_id, "role_id": role_id, "permission_id": permission_id }
        ])))
        .mount(&mock_server)
        .await;

    // The existing row comes back untouched, so no insert may happen.
    Mock::given(method("POST"))
        .and(path("/rest/v1/role_has_permissions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    let result = assign_permission(
        State(config.to_arc()),
        Path(role_id),
        auth_header(&config, &admin),
        user_extension(&admin),
        Json(AssignPermissionRequest {
            permission: Some(permission_id),
        }),
    )
    .await;

    let Json(body) = result.unwrap();
    assert_eq!(body["message"], "Permission assigned");
    assert_eq!(body["assignment"]["id"], json!(assignment_id));
}

#[tokio::test]
async fn assigning_an_unknown_permission_is_not_found() {
    let mock_server = MockServer::start().await;
    let role_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([role_row(role_id, "receptionist")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    let result = assign_permission(
        State(config.to_arc()),
        Path(role_id),
        auth_header(&config, &admin),
        user_extension(&admin),
        Json(AssignPermissionRequest {
            permission: Some(Uuid::new_v4()),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}
