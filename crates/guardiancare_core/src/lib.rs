pub mod domain;
pub mod ports;
pub mod protocol;
pub mod registration;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use domain::{Device, DeviceToken, DeviceType, RegistrationState, Session, UnknownVariant, UserRole};
pub use ports::{
    CredentialChange, CredentialKey, CredentialStore, DeviceRepository, GatewayError,
    NotificationGateway, PortError, PortResult,
};
pub use protocol::{DeviceRecord, DeviceRegistrationRequest, DeviceRegistrationResponse};
pub use registration::{RegistrationClient, RegistrationError, RetryPolicy};
pub use session::SessionManager;
pub use store::MemoryCredentialStore;
