//! crates/guardiancare_core/src/session.rs
//!
//! The session lifecycle manager. It is the only writer of the credential
//! store, and it starts or cancels the background device registration.
//!
//! One `SessionManager` is built by the application root and shared as an
//! `Arc`. Writes are serialized through an async mutex. The device slot is
//! behind a sync mutex that is never held across an await.

use crate::domain::{DeviceToken, RegistrationState, Session, UserRole};
use crate::ports::{CredentialKey, CredentialStore, PortError, PortResult};
use crate::protocol::DeviceRegistrationResponse;
use crate::registration::{token_prefix, RegistrationClient, RegistrationError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

//=========================================================================================
// Device Slot
//=========================================================================================

/// The current device token plus the bookkeeping for its registration task.
struct DeviceSlot {
    device: Option<DeviceToken>,
    /// The user the current `Pending`/`Registered` state refers to.
    target_user: Option<String>,
    /// Bumped on every supersession; outcomes from older generations are ignored.
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    /// Fires once the last logout's unregistration has finished.
    unregistered: CancellationToken,
    unregister_task: Option<JoinHandle<()>>,
}

impl DeviceSlot {
    fn new() -> Self {
        let unregistered = CancellationToken::new();
        unregistered.cancel();
        Self {
            device: None,
            target_user: None,
            generation: 0,
            cancel: CancellationToken::new(),
            task: None,
            unregistered,
            unregister_task: None,
        }
    }

    /// Cancels whatever is in flight and opens a new generation.
    fn supersede(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
    }
}

struct DeviceTracker {
    slot: Mutex<DeviceSlot>,
    status: watch::Sender<Option<DeviceToken>>,
}

impl DeviceTracker {
    fn new() -> Self {
        let (status, _) = watch::channel(None);
        Self {
            slot: Mutex::new(DeviceSlot::new()),
            status,
        }
    }

    fn publish(&self, slot: &DeviceSlot) {
        self.status.send_replace(slot.device.clone());
    }

    /// Makes `token` the current device token. A different prior value is
    /// superseded and its in-flight registration cancelled.
    fn adopt(&self, token: &str) {
        let mut slot = self.slot.lock();
        if slot.device.as_ref().is_some_and(|device| device.token == token) {
            return;
        }
        if let Some(previous) = &slot.device {
            info!(
                "Device token rotated, superseding {}...",
                token_prefix(&previous.token)
            );
        }
        slot.supersede();
        slot.device = Some(DeviceToken::issued(token));
        slot.target_user = None;
        self.publish(&slot);
    }

    fn record_attempt(&self, generation: u64, attempt: u32) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        if let Some(device) = slot.device.as_mut() {
            device.state = RegistrationState::Pending;
            device.attempt_count = attempt;
        }
        self.publish(&slot);
    }

    fn record_outcome(
        &self,
        generation: u64,
        user_id: &str,
        outcome: Result<DeviceRegistrationResponse, RegistrationError>,
    ) {
        if let Err(RegistrationError::Superseded) = outcome {
            debug!("Registration for a superseded device token abandoned.");
            return;
        }

        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        let Some(device) = slot.device.as_mut() else {
            return;
        };
        match outcome {
            Ok(_) => {
                device.state = RegistrationState::Registered;
            }
            Err(e) => {
                warn!("Device registration for user {} left failed: {}", user_id, e);
                device.state = RegistrationState::Failed;
            }
        }
        self.publish(&slot);
    }
}

//=========================================================================================
// Session Manager
//=========================================================================================

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    registrar: Arc<RegistrationClient>,
    writes: tokio::sync::Mutex<()>,
    tracker: Arc<DeviceTracker>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, registrar: RegistrationClient) -> Self {
        Self {
            store,
            registrar: Arc::new(registrar),
            writes: tokio::sync::Mutex::new(()),
            tracker: Arc::new(DeviceTracker::new()),
        }
    }

    /// Persists the session in one atomic write, then registers the known
    /// device token in the background unless it is already registered (or
    /// being registered) for this user.
    pub async fn save_session(&self, session: &Session) -> PortResult<()> {
        let _writes = self.writes.lock().await;
        info!("Saving user session for user {}", session.user_id);

        self.store
            .write(&[
                (CredentialKey::SessionToken, Some(session.session_token.clone())),
                (CredentialKey::UserRole, Some(session.user_role.as_str().to_string())),
                (CredentialKey::UserId, Some(session.user_id.clone())),
                (CredentialKey::ElderlyId, session.elderly_id.clone()),
            ])
            .await?;

        match self.store.get(CredentialKey::DeviceToken).await? {
            Some(token) => {
                self.tracker.adopt(&token);
                self.start_registration(&session.user_id);
            }
            None => warn!("No device token available to register"),
        }
        Ok(())
    }

    /// Stores a freshly issued device token. A rotation cancels any pending
    /// registration of the previous value before this returns.
    pub async fn save_device_token(&self, token: &str) -> PortResult<()> {
        let _writes = self.writes.lock().await;
        debug!("Saving device token {}...", token_prefix(token));

        self.store
            .write(&[(CredentialKey::DeviceToken, Some(token.to_string()))])
            .await?;
        self.tracker.adopt(token);

        match self.store.get(CredentialKey::UserId).await? {
            Some(user_id) => self.start_registration(&user_id),
            None => debug!("No user logged in, device token kept for the next login"),
        }
        Ok(())
    }

    pub async fn save_elderly_id(&self, elderly_id: &str) -> PortResult<()> {
        let _writes = self.writes.lock().await;
        self.store
            .write(&[(CredentialKey::ElderlyId, Some(elderly_id.to_string()))])
            .await
    }

    /// Re-attempts registration of a persisted device token after a restart.
    pub async fn resume(&self) -> PortResult<()> {
        let _writes = self.writes.lock().await;
        let Some(token) = self.store.get(CredentialKey::DeviceToken).await? else {
            debug!("No persisted device token to resume");
            return Ok(());
        };
        self.tracker.adopt(&token);
        if let Some(user_id) = self.store.get(CredentialKey::UserId).await? {
            info!("Resuming device registration for user {}", user_id);
            self.start_registration(&user_id);
        }
        Ok(())
    }

    /// Clears every persisted field in one operation and asks the service to
    /// forget the device token. The unregistration is best-effort.
    pub async fn logout(&self) -> PortResult<()> {
        let _writes = self.writes.lock().await;
        info!("Clearing user session");

        let user_id = self.store.get(CredentialKey::UserId).await?;
        let bearer = self.store.get(CredentialKey::SessionToken).await?;
        let device_token = self.store.get(CredentialKey::DeviceToken).await?;

        {
            let mut slot = self.tracker.slot.lock();
            slot.supersede();
            slot.device = None;
            slot.target_user = None;
            self.tracker.publish(&slot);
        }

        self.store.clear().await?;

        if let (Some(user_id), Some(bearer), Some(token)) = (user_id, bearer, device_token) {
            let registrar = self.registrar.clone();
            let previous = self.tracker.slot.lock().unregister_task.take();
            let unregistered = CancellationToken::new();
            let done = unregistered.clone().drop_guard();
            let task = tokio::spawn(async move {
                let _done = done;
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                if let Err(e) = registrar.unregister_device(&user_id, &token, &bearer).await {
                    warn!("Failed to unregister device token on logout: {}", e);
                }
            });
            let mut slot = self.tracker.slot.lock();
            slot.unregistered = unregistered;
            slot.unregister_task = Some(task);
        }
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Reads
    //-------------------------------------------------------------------------------------

    pub async fn read_token(&self) -> PortResult<Option<String>> {
        self.store.get(CredentialKey::SessionToken).await
    }

    pub async fn read_user_id(&self) -> PortResult<Option<String>> {
        self.store.get(CredentialKey::UserId).await
    }

    pub async fn read_user_role(&self) -> PortResult<Option<UserRole>> {
        match self.store.get(CredentialKey::UserRole).await? {
            Some(raw) => raw
                .parse::<UserRole>()
                .map(Some)
                .map_err(|e| PortError::Unexpected(format!("Stored user role is invalid: {}", e))),
            None => Ok(None),
        }
    }

    /// The supervised principal, falling back to the user id.
    pub async fn read_elderly_id(&self) -> PortResult<Option<String>> {
        match self.store.get(CredentialKey::ElderlyId).await? {
            Some(elderly_id) => Ok(Some(elderly_id)),
            None => self.read_user_id().await,
        }
    }

    pub async fn read_device_token(&self) -> PortResult<Option<String>> {
        self.store.get(CredentialKey::DeviceToken).await
    }

    /// The whole session, if token, user id and role are all present.
    pub async fn read_session(&self) -> PortResult<Option<Session>> {
        let (Some(session_token), Some(user_id), Some(user_role)) = (
            self.read_token().await?,
            self.read_user_id().await?,
            self.read_user_role().await?,
        ) else {
            return Ok(None);
        };
        let elderly_id = self.store.get(CredentialKey::ElderlyId).await?;
        Ok(Some(Session {
            session_token,
            user_id,
            user_role,
            elderly_id,
        }))
    }

    pub fn device_status(&self) -> Option<DeviceToken> {
        self.tracker.slot.lock().device.clone()
    }

    /// Observes every device state transition.
    pub fn subscribe(&self) -> watch::Receiver<Option<DeviceToken>> {
        self.tracker.status.subscribe()
    }

    /// Waits for the background registration or unregistration work started
    /// so far, including work started while waiting.
    pub async fn settle(&self) {
        loop {
            let task = {
                let mut slot = self.tracker.slot.lock();
                match slot.unregister_task.take() {
                    Some(task) => Some(task),
                    None => slot.task.take(),
                }
            };
            let Some(task) = task else {
                break;
            };
            if let Err(e) = task.await {
                error!("Background device task failed: {:?}", e);
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Registration Trigger
    //-------------------------------------------------------------------------------------

    fn start_registration(&self, user_id: &str) {
        let mut slot = self.tracker.slot.lock();
        let Some(device) = slot.device.as_ref() else {
            return;
        };
        let in_hand = matches!(
            device.state,
            RegistrationState::Pending | RegistrationState::Registered
        ) && slot.target_user.as_deref() == Some(user_id);
        if in_hand {
            debug!("Device token already registered or pending for user {}", user_id);
            return;
        }
        let token = device.token.clone();

        slot.supersede();
        slot.target_user = Some(user_id.to_string());
        if let Some(device) = slot.device.as_mut() {
            device.state = RegistrationState::Pending;
            device.attempt_count = 0;
        }
        let generation = slot.generation;
        let cancel = slot.cancel.clone();
        let unregistered = slot.unregistered.clone();

        let tracker = self.tracker.clone();
        let registrar = self.registrar.clone();
        let user_id = user_id.to_string();
        let task = tokio::spawn(async move {
            // A pending logout unregistration lands first.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = unregistered.cancelled() => {}
            }
            let outcome = registrar
                .register_device_observed(&user_id, &token, &cancel, |attempt| {
                    tracker.record_attempt(generation, attempt)
                })
                .await;
            tracker.record_outcome(generation, &user_id, outcome);
        });
        slot.task = Some(task);
        self.tracker.publish(&slot);
    }
}
