//! services/device_agent/src/bin/device_agent.rs

use device_agent_lib::{
    config::ClientConfig, error::ClientError, FileCredentialStore, HttpNotificationGateway,
};
use guardiancare_core::{RegistrationClient, RegistrationState, SessionManager};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = ClientConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting device agent...");

    // --- 2. Initialize Adapters ---
    let store = Arc::new(FileCredentialStore::open(&config.credentials_path).await?);
    info!("Credential store opened at {}", store.path().display());
    let gateway = Arc::new(HttpNotificationGateway::new(
        config.notification_url.clone(),
        config.request_timeout,
    )?);

    // --- 3. Build the Session Manager ---
    let registrar = RegistrationClient::new(gateway, store.clone())
        .with_policy(config.retry_policy())
        .with_device_type(config.device_type);
    let sessions = SessionManager::new(store, registrar);

    // --- 4. Apply Whatever the Host Handed Over ---
    match &config.session {
        Some(session) => {
            info!("Saving session for user {}", session.user_id);
            sessions.save_session(session).await?;
        }
        None => sessions.resume().await?,
    }
    if let Some(token) = &config.device_token {
        sessions.save_device_token(token).await?;
    }

    // --- 5. Wait for Registration to Settle ---
    sessions.settle().await;
    match sessions.device_status() {
        Some(status) if status.state == RegistrationState::Registered => {
            info!("Device registered after {} attempt(s).", status.attempt_count)
        }
        Some(status) => warn!(
            "Device registration ended in state {:?} after {} attempt(s).",
            status.state, status.attempt_count
        ),
        None => info!("No device token on record; nothing to register."),
    }

    Ok(())
}
