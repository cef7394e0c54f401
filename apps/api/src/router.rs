use std::sync::Arc;

use axum::{routing::get, Router};

use access_cell::router::access_routes;
use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointments API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/access", access_routes(state.clone()))
}
