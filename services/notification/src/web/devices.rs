//! services/notification/src/web/devices.rs
//!
//! Device registration endpoints: register, unregister and list the push
//! tokens associated with a user.

use crate::web::{middleware::BearerToken, state::AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use guardiancare_core::{
    domain::DeviceType,
    protocol::{DeviceRecord, DeviceRegistrationRequest, DeviceRegistrationResponse},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

type HandlerError = (StatusCode, Json<DeviceRegistrationResponse>);

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// The registration body as received. Fields are optional so that a missing
/// one is answered with the service's own error envelope.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    pub user_id: Option<String>,
    pub device_token: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceListResponse {
    pub status: String,
    pub data: Vec<DeviceRecord>,
}

fn bad_request(message: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(DeviceRegistrationResponse::error(message)),
    )
}

fn internal_error(message: &str) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(DeviceRegistrationResponse::error(message)),
    )
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/devices/register - Associate a push token with a user
#[utoipa::path(
    post,
    path = "/api/devices/register",
    request_body = DeviceRegistrationRequest,
    responses(
        (status = 200, description = "Device registered successfully", body = DeviceRegistrationResponse),
        (status = 400, description = "Missing or invalid field", body = DeviceRegistrationResponse),
        (status = 401, description = "No bearer token", body = DeviceRegistrationResponse),
        (status = 500, description = "Internal server error", body = DeviceRegistrationResponse)
    ),
    params(
        ("Authorization" = String, Header, description = "Bearer <session token>")
    )
)]
pub async fn register_device_handler(
    State(state): State<Arc<AppState>>,
    Extension(_bearer): Extension<BearerToken>,
    Json(payload): Json<DevicePayload>,
) -> Result<Json<DeviceRegistrationResponse>, HandlerError> {
    let (Some(user_id), Some(device_token), Some(device_type)) = (
        present(payload.user_id),
        present(payload.device_token),
        present(payload.device_type),
    ) else {
        return Err(bad_request(
            "userId, deviceToken, and deviceType are required",
        ));
    };

    let device_type = device_type
        .parse::<DeviceType>()
        .map_err(|_| bad_request("deviceType must be one of android, ios, web"))?;

    let device = state
        .devices
        .upsert_device(&user_id, &device_token, device_type)
        .await
        .map_err(|e| {
            error!("Error registering device: {:?}", e);
            internal_error("Failed to register device")
        })?;

    info!("[DEVICE] Device registered for user {}", user_id);
    Ok(Json(DeviceRegistrationResponse::success(
        "Device registered successfully",
        Some(device.into()),
    )))
}

/// POST /api/devices/unregister - Forget a push token
#[utoipa::path(
    post,
    path = "/api/devices/unregister",
    request_body = DeviceRegistrationRequest,
    responses(
        (status = 200, description = "Device unregistered successfully", body = DeviceRegistrationResponse),
        (status = 400, description = "Missing field", body = DeviceRegistrationResponse),
        (status = 401, description = "No bearer token", body = DeviceRegistrationResponse),
        (status = 500, description = "Internal server error", body = DeviceRegistrationResponse)
    ),
    params(
        ("Authorization" = String, Header, description = "Bearer <session token>")
    )
)]
pub async fn unregister_device_handler(
    State(state): State<Arc<AppState>>,
    Extension(_bearer): Extension<BearerToken>,
    Json(payload): Json<DevicePayload>,
) -> Result<Json<DeviceRegistrationResponse>, HandlerError> {
    let (Some(user_id), Some(device_token)) =
        (present(payload.user_id), present(payload.device_token))
    else {
        return Err(bad_request("userId and deviceToken are required"));
    };

    let removed = state
        .devices
        .remove_device(&user_id, &device_token)
        .await
        .map_err(|e| {
            error!("Error unregistering device: {:?}", e);
            internal_error("Failed to unregister device")
        })?;

    if removed {
        info!("[DEVICE] Device removed for user {}", user_id);
    } else {
        info!("[DEVICE] No matching device to remove for user {}", user_id);
    }
    Ok(Json(DeviceRegistrationResponse::success(
        "Device unregistered successfully",
        None,
    )))
}

/// GET /api/devices?userId= - List the devices registered for a user
#[utoipa::path(
    get,
    path = "/api/devices",
    params(
        DeviceQuery,
        ("Authorization" = String, Header, description = "Bearer <session token>")
    ),
    responses(
        (status = 200, description = "Registered devices", body = DeviceListResponse),
        (status = 400, description = "Missing userId", body = DeviceRegistrationResponse),
        (status = 401, description = "No bearer token", body = DeviceRegistrationResponse)
    )
)]
pub async fn list_devices_handler(
    State(state): State<Arc<AppState>>,
    Extension(_bearer): Extension<BearerToken>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<DeviceListResponse>, HandlerError> {
    let user_id = present(query.user_id).ok_or_else(|| bad_request("userId is required"))?;

    let devices = state.devices.devices_for_user(&user_id).await.map_err(|e| {
        error!("Error getting devices for user {}: {:?}", user_id, e);
        internal_error("Failed to get devices")
    })?;

    Ok(Json(DeviceListResponse {
        status: "success".to_string(),
        data: devices.into_iter().map(DeviceRecord::from).collect(),
    }))
}
