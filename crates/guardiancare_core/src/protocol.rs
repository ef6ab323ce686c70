//! crates/guardiancare_core/src/protocol.rs
//!
//! Wire types for the Notification Service device endpoints. The device agent
//! sends them and the notification service answers with them.

use crate::domain::{Device, DeviceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REGISTER_DEVICE_PATH: &str = "/api/devices/register";
pub const UNREGISTER_DEVICE_PATH: &str = "/api/devices/unregister";

/// Body of `POST /api/devices/register` and `POST /api/devices/unregister`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub user_id: String,
    pub device_token: String,
    pub device_type: DeviceType,
}

/// The `{status, message, data?}` envelope every device endpoint answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeviceRegistrationResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DeviceRecord>,
}

impl DeviceRegistrationResponse {
    pub fn success(message: impl Into<String>, data: Option<DeviceRecord>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub user_id: String,
    pub device_token: String,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceRecord {
    fn from(device: Device) -> Self {
        Self {
            user_id: device.user_id,
            device_token: device.device_token,
            device_type: device.device_type,
            created_at: device.created_at,
        }
    }
}
