//! services/device_agent/src/config.rs
//!
//! Defines the agent's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use guardiancare_core::{DeviceType, RetryPolicy, Session, UserRole};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub notification_url: String,
    pub credentials_path: PathBuf,
    pub request_timeout: Duration,
    pub device_type: DeviceType,
    pub max_retries: u32,
    pub log_level: Level,
    /// A login handed over by the host application at start.
    pub session: Option<Session>,
    /// A device token handed over by the messaging provider at start.
    pub device_token: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let notification_url = lookup("NOTIFICATION_SERVICE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let credentials_path = lookup("CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./guardiancare_credentials.json"));

        let request_timeout = Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?);
        let max_retries = parse_or(&lookup, "REGISTRATION_MAX_RETRIES", 3)?;

        let device_type = match lookup("DEVICE_TYPE") {
            Some(raw) => raw.parse::<DeviceType>().map_err(|e| {
                ConfigError::InvalidValue("DEVICE_TYPE".to_string(), e.to_string())
            })?,
            None => DeviceType::Android,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Optional login seeded by the host application ---
        let session = match lookup("SESSION_TOKEN") {
            Some(session_token) => {
                let user_id = lookup("USER_ID")
                    .ok_or_else(|| ConfigError::MissingVar("USER_ID".to_string()))?;
                let role = lookup("USER_ROLE")
                    .ok_or_else(|| ConfigError::MissingVar("USER_ROLE".to_string()))?;
                let user_role = role.parse::<UserRole>().map_err(|e| {
                    ConfigError::InvalidValue("USER_ROLE".to_string(), e.to_string())
                })?;
                Some(Session::new(session_token, user_role, user_id, lookup("ELDERLY_ID")))
            }
            None => None,
        };
        let device_token = lookup("DEVICE_TOKEN");

        Ok(Self {
            notification_url,
            credentials_path,
            request_timeout,
            device_type,
            max_retries,
            log_level,
            session,
            device_token,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
