//! crates/guardiancare_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the session and device
//! registration core. These traits form the boundary of the hexagonal
//! architecture: the credential store, the Notification Service as seen by a
//! device, and the Notification Service's own device storage.

use crate::domain::{Device, DeviceType};
use crate::protocol::{DeviceRegistrationRequest, DeviceRegistrationResponse};
use async_trait::async_trait;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., disk, database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Credential Store
//=========================================================================================

/// The named fields persisted per installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    SessionToken,
    UserRole,
    UserId,
    DeviceToken,
    ElderlyId,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 5] = [
        CredentialKey::SessionToken,
        CredentialKey::UserRole,
        CredentialKey::UserId,
        CredentialKey::DeviceToken,
        CredentialKey::ElderlyId,
    ];

    /// The key the value is persisted under.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::SessionToken => "jwt_token",
            CredentialKey::UserRole => "user_type",
            CredentialKey::UserId => "user_id",
            CredentialKey::DeviceToken => "fcm_token",
            CredentialKey::ElderlyId => "elderly_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an atomic write. `None` removes the field.
pub type CredentialChange = (CredentialKey, Option<String>);

/// Durable key-value persistence for one installation.
///
/// A write is visible to every subsequent `get` without further
/// synchronization by the caller.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: CredentialKey) -> PortResult<Option<String>>;

    /// Applies every change or none of them.
    async fn write(&self, changes: &[CredentialChange]) -> PortResult<()>;

    /// Removes every named field in one operation.
    async fn clear(&self) -> PortResult<()>;
}

//=========================================================================================
// Notification Gateway (device side)
//=========================================================================================

/// Why a call to the Notification Service did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The service was reached and declined the request.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The request could not complete (unreachable, timeout, unreadable body).
    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Associates a device token with a user. `bearer` is the raw session token.
    async fn register_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError>;

    async fn unregister_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError>;
}

//=========================================================================================
// Device Repository (Notification Service side)
//=========================================================================================

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Inserts the registration, or refreshes its device type if the
    /// `(user_id, device_token)` pair already exists.
    async fn upsert_device(
        &self,
        user_id: &str,
        device_token: &str,
        device_type: DeviceType,
    ) -> PortResult<Device>;

    /// Returns whether a registration was removed.
    async fn remove_device(&self, user_id: &str, device_token: &str) -> PortResult<bool>;

    async fn devices_for_user(&self, user_id: &str) -> PortResult<Vec<Device>>;
}
