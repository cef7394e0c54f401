// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        // Core appointment management
        .route("/", post(handlers::create_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        // Specialized views
        .route("/completed", get(handlers::get_completed_appointments))
        .route("/pending", get(handlers::get_pending_appointments))
        .route("/range", get(handlers::get_appointments_in_range))
        // Utility endpoints
        .route("/availability", get(handlers::check_availability))
        // Status catalog
        .route("/statuses", get(handlers::list_statuses))
        .route("/statuses", post(handlers::create_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
