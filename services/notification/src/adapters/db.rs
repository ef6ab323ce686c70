//! services/notification/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DeviceRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guardiancare_core::domain::{Device, DeviceType};
use guardiancare_core::ports::{DeviceRepository, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DeviceRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DeviceRow {
    user_id: String,
    device_token: String,
    device_type: String,
    created_at: DateTime<Utc>,
}

impl DeviceRow {
    fn to_domain(self) -> PortResult<Device> {
        let device_type = self.device_type.parse::<DeviceType>().map_err(|e| {
            PortError::Unexpected(format!("Stored device type is invalid: {}", e))
        })?;
        Ok(Device {
            user_id: self.user_id,
            device_token: self.device_token,
            device_type,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DeviceRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl DeviceRepository for DbAdapter {
    async fn upsert_device(
        &self,
        user_id: &str,
        device_token: &str,
        device_type: DeviceType,
    ) -> PortResult<Device> {
        let record = sqlx::query_as::<_, DeviceRow>(
            "INSERT INTO devices (id, user_id, device_token, device_type) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, device_token) DO UPDATE SET device_type = EXCLUDED.device_type \
             RETURNING user_id, device_token, device_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(device_token)
        .bind(device_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn remove_device(&self, user_id: &str, device_token: &str) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE user_id = $1 AND device_token = $2")
            .bind(user_id)
            .bind(device_token)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn devices_for_user(&self, user_id: &str) -> PortResult<Vec<Device>> {
        let records = sqlx::query_as::<_, DeviceRow>(
            "SELECT user_id, device_token, device_type, created_at FROM devices \
             WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(DeviceRow::to_domain).collect()
    }
}
