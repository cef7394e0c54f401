// libs/access-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn access_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/roles", get(handlers::list_roles))
        .route("/roles", post(handlers::create_role))
        .route("/roles/{role_id}", get(handlers::get_role))
        .route("/roles/{role_id}", put(handlers::update_role))
        .route("/roles/{role_id}", delete(handlers::delete_role))
        .route("/roles/{role_id}/permissions", get(handlers::role_permissions))
        .route("/roles/{role_id}/permissions", post(handlers::assign_permission))
        .route("/permissions", get(handlers::list_permissions))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
