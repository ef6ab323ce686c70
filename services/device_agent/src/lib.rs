//! services/device_agent/src/lib.rs
//!
//! The on-device side of GuardianCare: persisted credentials plus the HTTP
//! client for the Notification Service.

pub mod config;
pub mod error;
pub mod file_store;
pub mod http_gateway;

pub use file_store::FileCredentialStore;
pub use http_gateway::HttpNotificationGateway;
