//! crates/guardiancare_core/src/testing.rs
//!
//! A scripted `NotificationGateway` shared by the unit tests.

use crate::ports::{GatewayError, NotificationGateway};
use crate::protocol::{DeviceRecord, DeviceRegistrationRequest, DeviceRegistrationResponse};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Accept,
    Reject,
    Unreachable,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub at: Instant,
    pub bearer: String,
    pub request: DeviceRegistrationRequest,
}

pub(crate) struct RecordingGateway {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<RecordedCall>>,
    unregister_calls: Mutex<Vec<RecordedCall>>,
    unregister_delay: Mutex<Duration>,
    /// The `(user_id, device_token)` pairs the service currently holds.
    rows: Mutex<HashSet<(String, String)>>,
}

impl RecordingGateway {
    pub fn always(reply: Reply) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    /// Answers with `script` in order, then with `fallback` forever.
    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            unregister_calls: Mutex::new(Vec::new()),
            unregister_delay: Mutex::new(Duration::ZERO),
            rows: Mutex::new(HashSet::new()),
        })
    }

    /// Holds every unregistration this long before it takes effect.
    pub fn set_unregister_delay(&self, delay: Duration) {
        *self.unregister_delay.lock() = delay;
    }

    pub fn has_row(&self, user_id: &str, device_token: &str) -> bool {
        self.rows
            .lock()
            .contains(&(user_id.to_string(), device_token.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn unregister_calls(&self) -> Vec<RecordedCall> {
        self.unregister_calls.lock().clone()
    }

    fn answer(
        &self,
        request: &DeviceRegistrationRequest,
        message: &str,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        let reply = self.script.lock().pop_front().unwrap_or(self.fallback);
        match reply {
            Reply::Accept => Ok(DeviceRegistrationResponse::success(
                message,
                Some(DeviceRecord {
                    user_id: request.user_id.clone(),
                    device_token: request.device_token.clone(),
                    device_type: request.device_type,
                    created_at: Utc::now(),
                }),
            )),
            Reply::Reject => Err(GatewayError::Rejected {
                status: 500,
                message: "Failed to register device".to_string(),
            }),
            Reply::Unreachable => Err(GatewayError::Transport("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn register_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        self.calls.lock().push(RecordedCall {
            at: Instant::now(),
            bearer: bearer.to_string(),
            request: request.clone(),
        });
        let response = self.answer(request, "Device registered successfully")?;
        self.rows
            .lock()
            .insert((request.user_id.clone(), request.device_token.clone()));
        Ok(response)
    }

    async fn unregister_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        self.unregister_calls.lock().push(RecordedCall {
            at: Instant::now(),
            bearer: bearer.to_string(),
            request: request.clone(),
        });
        let delay = *self.unregister_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let response = self.answer(request, "Device unregistered successfully")?;
        self.rows
            .lock()
            .remove(&(request.user_id.clone(), request.device_token.clone()));
        Ok(response)
    }
}
