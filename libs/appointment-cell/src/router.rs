// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::get_appointments))
        .route("/", post(handlers::create_appointment))

        // Doctor decisions on pending bookings
        .route("/approve/{appointment_id}", put(handlers::approve_appointment))
        .route("/decline/{appointment_id}", put(handlers::decline_appointment))
        .route("/complete/{appointment_id}", put(handlers::complete_appointment))

        // Room-code lookup for online visits
        .route("/join/{appointment_id}", get(handlers::join_appointment))

        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
