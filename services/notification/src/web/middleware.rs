//! services/notification/src/web/middleware.rs
//!
//! Authentication middleware for protecting the device routes.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use guardiancare_core::protocol::DeviceRegistrationResponse;
use tracing::warn;

/// The session token presented by the caller, minus the `Bearer ` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Middleware that requires an `Authorization: Bearer <token>` header.
///
/// If present, inserts the token into request extensions for handlers to use.
/// If missing or empty, returns 401 Unauthorized. Token validation belongs to
/// the auth service.
pub async fn require_bearer(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<DeviceRegistrationResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let Some(token) = token else {
        warn!("[DEVICE] Missing bearer token on {}", req.uri().path());
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(DeviceRegistrationResponse::error(
                "Authorization header with a Bearer token is required",
            )),
        ));
    };

    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}
