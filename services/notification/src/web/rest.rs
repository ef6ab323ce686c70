//! services/notification/src/web/rest.rs
//!
//! Contains the health endpoint and the master definition for the OpenAPI
//! specification.

use crate::web::devices::{self, DeviceListResponse, DevicePayload};
use axum::Json;
use guardiancare_core::{
    domain::DeviceType,
    protocol::{DeviceRecord, DeviceRegistrationRequest, DeviceRegistrationResponse},
};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        devices::register_device_handler,
        devices::unregister_device_handler,
        devices::list_devices_handler,
    ),
    components(
        schemas(
            DeviceRegistrationRequest,
            DeviceRegistrationResponse,
            DeviceRecord,
            DeviceType,
            DevicePayload,
            DeviceListResponse
        )
    ),
    tags(
        (name = "GuardianCare Notification API", description = "Device registration endpoints for push notifications.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = DeviceRegistrationResponse)
    )
)]
pub async fn health_handler() -> Json<DeviceRegistrationResponse> {
    Json(DeviceRegistrationResponse::success(
        "Notification service is running",
        None,
    ))
}
