pub mod devices;
pub mod middleware;
pub mod rest;
pub mod state;

pub use devices::{list_devices_handler, register_device_handler, unregister_device_handler};
pub use middleware::require_bearer;
pub use rest::health_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use guardiancare_core::protocol::{REGISTER_DEVICE_PATH, UNREGISTER_DEVICE_PATH};
use state::AppState;
use std::sync::Arc;

/// Builds the API router. Device routes sit behind the bearer middleware.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (bearer required)
    let protected_routes = Router::new()
        .route(REGISTER_DEVICE_PATH, post(register_device_handler))
        .route(UNREGISTER_DEVICE_PATH, post(unregister_device_handler))
        .route("/api/devices", get(list_devices_handler))
        .layer(axum_middleware::from_fn(require_bearer));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
