//! crates/guardiancare_core/src/domain.rs
//!
//! Defines the pure, core data structures for session and device registration.
//! Only the small enums that travel on the wire carry serde derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Roles and Device Types
//=========================================================================================

/// The role of the authenticated principal. Fixed for a session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Elderly,
    Caretaker,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Elderly => "elderly",
            UserRole::Caretaker => "caretaker",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elderly" => Ok(UserRole::Elderly),
            "caretaker" => Ok(UserRole::Caretaker),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// The platform a push token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Android,
    Ios,
    Web,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Android => "android",
            DeviceType::Ios => "ios",
            DeviceType::Web => "web",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(DeviceType::Android),
            "ios" => Ok(DeviceType::Ios),
            "web" => Ok(DeviceType::Web),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when a persisted or received string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

//=========================================================================================
// Session
//=========================================================================================

/// The persisted proof of authentication for this installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_token: String,
    pub user_id: String,
    pub user_role: UserRole,
    /// The supervised principal. Reads fall back to `user_id` when absent.
    pub elderly_id: Option<String>,
}

impl Session {
    pub fn new(
        session_token: impl Into<String>,
        user_role: UserRole,
        user_id: impl Into<String>,
        elderly_id: Option<String>,
    ) -> Self {
        Self {
            session_token: session_token.into(),
            user_id: user_id.into(),
            user_role,
            elderly_id,
        }
    }

    pub fn effective_elderly_id(&self) -> &str {
        self.elderly_id.as_deref().unwrap_or(&self.user_id)
    }
}

//=========================================================================================
// Device Token
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Pending,
    Registered,
    Failed,
}

/// A push-messaging token and where its registration currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken {
    pub token: String,
    pub state: RegistrationState,
    /// Attempts made for this token value since the last triggering event.
    pub attempt_count: u32,
}

impl DeviceToken {
    /// A freshly issued token that has not been sent anywhere yet.
    pub fn issued(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            state: RegistrationState::Unregistered,
            attempt_count: 0,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }
}

//=========================================================================================
// Device (Notification Service side)
//=========================================================================================

/// A device registration held by the Notification Service.
/// Unique per `(user_id, device_token)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub user_id: String,
    pub device_token: String,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_from_persisted_names() {
        assert_eq!("caretaker".parse::<UserRole>(), Ok(UserRole::Caretaker));
        assert_eq!("elderly".parse::<UserRole>(), Ok(UserRole::Elderly));
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn device_type_serializes_lowercase() {
        let json = serde_json::to_string(&DeviceType::Ios).unwrap();
        assert_eq!(json, "\"ios\"");
        assert_eq!("web".parse::<DeviceType>(), Ok(DeviceType::Web));
    }

    #[test]
    fn elderly_id_falls_back_to_user_id() {
        let own = Session::new("t1", UserRole::Elderly, "u1", None);
        assert_eq!(own.effective_elderly_id(), "u1");

        let supervised = Session::new("t1", UserRole::Caretaker, "u1", Some("e9".into()));
        assert_eq!(supervised.effective_elderly_id(), "e9");
    }
}
