//! services/device_agent/src/http_gateway.rs
//!
//! This module contains the adapter for the Notification Service's device
//! endpoints. It implements the `NotificationGateway` port over HTTP.

use crate::error::ClientError;
use async_trait::async_trait;
use guardiancare_core::{
    protocol::{REGISTER_DEVICE_PATH, UNREGISTER_DEVICE_PATH},
    DeviceRegistrationRequest, DeviceRegistrationResponse, GatewayError, NotificationGateway,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Adapter Struct
//=========================================================================================

/// A gateway that talks to the Notification Service with `reqwest`.
#[derive(Clone)]
pub struct HttpNotificationGateway {
    client: Client,
    base_url: String,
}

impl HttpNotificationGateway {
    /// Creates a gateway whose every request gives up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(
        &self,
        path: &str,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        response
            .json::<DeviceRegistrationResponse>()
            .await
            .map_err(|e| GatewayError::Transport(format!("unreadable response body: {}", e)))
    }
}

/// Prefers the envelope's `message`, falling back to the raw body.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<DeviceRegistrationResponse>(body) {
        Ok(envelope) => envelope.message,
        Err(_) => body.to_string(),
    }
}

//=========================================================================================
// `NotificationGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn register_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        self.post(REGISTER_DEVICE_PATH, bearer, request).await
    }

    async fn unregister_device(
        &self,
        bearer: &str,
        request: &DeviceRegistrationRequest,
    ) -> Result<DeviceRegistrationResponse, GatewayError> {
        self.post(UNREGISTER_DEVICE_PATH, bearer, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardiancare_core::DeviceType;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> DeviceRegistrationRequest {
        DeviceRegistrationRequest {
            user_id: "u1".to_string(),
            device_token: "tokenA".to_string(),
            device_type: DeviceType::Android,
        }
    }

    fn gateway(server: &MockServer) -> HttpNotificationGateway {
        HttpNotificationGateway::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn register_sends_bearer_and_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/devices/register"))
            .and(header("authorization", "Bearer t1"))
            .and(body_json(json!({
                "userId": "u1",
                "deviceToken": "tokenA",
                "deviceType": "android"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Device registered successfully"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = gateway(&server).register_device("t1", &request()).await.unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.message, "Device registered successfully");
    }

    #[tokio::test]
    async fn non_success_status_is_a_rejection_with_the_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/devices/unregister"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "message": "userId and deviceToken are required"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).unregister_device("t1", &request()).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 400,
                message: "userId and deviceToken are required".to_string()
            }
        );
    }

    #[tokio::test]
    async fn plain_text_rejection_keeps_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = gateway(&server).register_device("t1", &request()).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected { status: 503, message: "maintenance".to_string() }
        );
    }

    #[tokio::test]
    async fn garbled_success_body_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway(&server).register_device("t1", &request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway =
            HttpNotificationGateway::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let err = gateway.register_device("t1", &request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
