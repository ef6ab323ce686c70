//! services/device_agent/tests/registration_flow.rs
//!
//! Drives the session manager against a mock Notification Service with the
//! file-backed credential store, the way the agent binary wires them.

use device_agent_lib::{FileCredentialStore, HttpNotificationGateway};
use guardiancare_core::{
    CredentialKey, CredentialStore, RegistrationClient, RegistrationError, RegistrationState,
    RetryPolicy, Session, SessionManager, UserRole,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        rejected_backoff: Duration::from_millis(20),
        transport_backoff: Duration::from_millis(40),
    }
}

async fn agent(server: &MockServer, dir: &TempDir) -> (Arc<FileCredentialStore>, SessionManager) {
    let store = Arc::new(
        FileCredentialStore::open(dir.path().join("credentials.json"))
            .await
            .unwrap(),
    );
    let gateway = Arc::new(HttpNotificationGateway::new(server.uri(), Duration::from_secs(2)).unwrap());
    let registrar = RegistrationClient::new(gateway, store.clone()).with_policy(fast_policy());
    let sessions = SessionManager::new(store.clone(), registrar);
    (store, sessions)
}

fn accepted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "message": "Device registered successfully"
    }))
}

#[tokio::test]
async fn token_before_login_registers_on_login_and_unregisters_on_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/register"))
        .and(header("authorization", "Bearer t1"))
        .and(body_partial_json(json!({ "userId": "u1", "deviceToken": "tokenA" })))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/unregister"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Device unregistered successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (store, sessions) = agent(&server, &dir).await;

    sessions.save_device_token("tokenA").await.unwrap();
    sessions.settle().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 0);

    sessions
        .save_session(&Session::new("t1", UserRole::Elderly, "u1", None))
        .await
        .unwrap();
    sessions.settle().await;
    let status = sessions.device_status().unwrap();
    assert_eq!(status.state, RegistrationState::Registered);
    assert_eq!(status.attempt_count, 1);

    sessions.logout().await.unwrap();
    sessions.settle().await;
    for key in CredentialKey::ALL {
        assert_eq!(store.get(key).await.unwrap(), None);
    }
    assert!(sessions.read_session().await.unwrap().is_none());
}

#[tokio::test]
async fn rejections_are_retried_until_the_service_accepts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/register"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "Failed to register device"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/register"))
        .respond_with(accepted())
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_store, sessions) = agent(&server, &dir).await;
    sessions
        .save_session(&Session::new("t1", UserRole::Caretaker, "u1", Some("e1".to_string())))
        .await
        .unwrap();
    sessions.save_device_token("tokenA").await.unwrap();
    sessions.settle().await;

    let status = sessions.device_status().unwrap();
    assert_eq!(status.state, RegistrationState::Registered);
    assert_eq!(status.attempt_count, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn persistent_rejection_stops_after_four_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/register"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(4)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (store, _sessions) = agent(&server, &dir).await;
    store
        .write(&[(CredentialKey::SessionToken, Some("t1".to_string()))])
        .await
        .unwrap();

    let gateway = Arc::new(HttpNotificationGateway::new(server.uri(), Duration::from_secs(2)).unwrap());
    let registrar = RegistrationClient::new(gateway, store.clone()).with_policy(fast_policy());
    let err = registrar
        .register_device("u1", "tokenA", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Rejected { status: 401, .. }));
}

#[tokio::test]
async fn persisted_login_resumes_registration_after_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/register"))
        .and(body_partial_json(json!({ "userId": "u1", "deviceToken": "tokenA" })))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    {
        let store = FileCredentialStore::open(dir.path().join("credentials.json"))
            .await
            .unwrap();
        store
            .write(&[
                (CredentialKey::SessionToken, Some("t1".to_string())),
                (CredentialKey::UserRole, Some("elderly".to_string())),
                (CredentialKey::UserId, Some("u1".to_string())),
                (CredentialKey::DeviceToken, Some("tokenA".to_string())),
            ])
            .await
            .unwrap();
    }

    let (_store, sessions) = agent(&server, &dir).await;
    assert_eq!(sessions.device_status(), None);
    sessions.resume().await.unwrap();
    sessions.settle().await;

    assert!(sessions.device_status().unwrap().is_registered());
    assert_eq!(sessions.read_elderly_id().await.unwrap().as_deref(), Some("u1"));
}
