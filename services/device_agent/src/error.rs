//! services/device_agent/src/error.rs

use crate::config::ConfigError;
use guardiancare_core::PortError;

/// The primary error type for the device agent.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential store error: {0}")]
    Port(#[from] PortError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
