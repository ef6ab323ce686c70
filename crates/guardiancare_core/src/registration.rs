//! crates/guardiancare_core/src/registration.rs
//!
//! The device registration client: sends a push token to the Notification
//! Service and retries on failure with a bounded, cancellable backoff loop.

use crate::domain::DeviceType;
use crate::ports::{CredentialKey, CredentialStore, GatewayError, NotificationGateway, PortError};
use crate::protocol::{DeviceRegistrationRequest, DeviceRegistrationResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// No session token is stored; nothing was sent.
    #[error("no session token is stored")]
    MissingCredential,
    #[error("registration rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// The device token changed while this attempt was in flight.
    #[error("superseded by a newer device token")]
    Superseded,
    #[error("credential store error: {0}")]
    Store(#[from] PortError),
}

impl From<GatewayError> for RegistrationError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Rejected { status, message } => {
                RegistrationError::Rejected { status, message }
            }
            GatewayError::Transport(reason) => RegistrationError::TransportFailure(reason),
        }
    }
}

//=========================================================================================
// Retry Policy
//=========================================================================================

/// Bounded linear backoff with a separate base delay per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay after the service declined the request.
    pub rejected_backoff: Duration,
    /// Base delay after the request could not complete.
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rejected_backoff: Duration::from_millis(5_000),
            transport_backoff: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt_index + 1`: `base * (attempt_index + 1)`.
    pub fn backoff(&self, failure: &GatewayError, attempt_index: u32) -> Duration {
        let base = match failure {
            GatewayError::Rejected { .. } => self.rejected_backoff,
            GatewayError::Transport(_) => self.transport_backoff,
        };
        base * (attempt_index + 1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

//=========================================================================================
// Registration Client
//=========================================================================================

pub struct RegistrationClient {
    gateway: Arc<dyn NotificationGateway>,
    store: Arc<dyn CredentialStore>,
    policy: RetryPolicy,
    device_type: DeviceType,
}

impl RegistrationClient {
    /// Creates a client for Android devices with the default retry policy.
    pub fn new(gateway: Arc<dyn NotificationGateway>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            gateway,
            store,
            policy: RetryPolicy::default(),
            device_type: DeviceType::Android,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub async fn register_device(
        &self,
        user_id: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<DeviceRegistrationResponse, RegistrationError> {
        self.register_device_observed(user_id, token, cancel, |_| {})
            .await
    }

    /// Registers `token` for `user_id`, retrying per the policy.
    ///
    /// `on_attempt` receives the 1-based number of every attempt right before
    /// the request goes out. The session token is re-read before each attempt;
    /// if it is missing the call ends with `MissingCredential` without touching
    /// the network. Cancelling `cancel` ends the call with `Superseded` and no
    /// further request is made.
    pub async fn register_device_observed<F>(
        &self,
        user_id: &str,
        token: &str,
        cancel: &CancellationToken,
        on_attempt: F,
    ) -> Result<DeviceRegistrationResponse, RegistrationError>
    where
        F: Fn(u32) + Send + Sync,
    {
        let request = DeviceRegistrationRequest {
            user_id: user_id.to_string(),
            device_token: token.to_string(),
            device_type: self.device_type,
        };
        let mut attempt_index: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!("Registration of token {}... abandoned before sending.", token_prefix(token));
                return Err(RegistrationError::Superseded);
            }

            let bearer = self.session_bearer().await?;
            on_attempt(attempt_index + 1);
            info!(
                "Registering device token {}... for user {} (attempt {}/{})",
                token_prefix(token),
                user_id,
                attempt_index + 1,
                self.policy.max_attempts()
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistrationError::Superseded),
                result = self.gateway.register_device(&bearer, &request) => result,
            };

            let failure = match result {
                Ok(response) => {
                    info!("Device token registered successfully for user {}", user_id);
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            if attempt_index >= self.policy.max_retries {
                error!(
                    "Giving up on device registration for user {} after {} attempts: {}",
                    user_id,
                    attempt_index + 1,
                    failure
                );
                return Err(failure.into());
            }

            let delay = self.policy.backoff(&failure, attempt_index);
            warn!(
                "Failed to register device token ({}). Retrying in {} seconds.",
                failure,
                delay.as_secs()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistrationError::Superseded),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt_index += 1;
        }
    }

    /// Asks the service to forget `token`. A single attempt; the caller
    /// decides whether a failure matters.
    pub async fn unregister_device(
        &self,
        user_id: &str,
        token: &str,
        bearer: &str,
    ) -> Result<(), RegistrationError> {
        if bearer.is_empty() {
            return Err(RegistrationError::MissingCredential);
        }
        let request = DeviceRegistrationRequest {
            user_id: user_id.to_string(),
            device_token: token.to_string(),
            device_type: self.device_type,
        };
        self.gateway.unregister_device(bearer, &request).await?;
        info!("Device token {}... unregistered for user {}", token_prefix(token), user_id);
        Ok(())
    }

    async fn session_bearer(&self) -> Result<String, RegistrationError> {
        match self.store.get(CredentialKey::SessionToken).await? {
            Some(bearer) if !bearer.is_empty() => Ok(bearer),
            _ => {
                error!("Authentication token not found. Cannot register device token.");
                Err(RegistrationError::MissingCredential)
            }
        }
    }
}

/// The first few characters of a token, for logs.
pub(crate) fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(10) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}
