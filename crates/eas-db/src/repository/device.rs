//! Device provisioning state repository.

use eas_core::types::DeviceRecord;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};

/// Reads and writes `device_records` rows: whether a device has completed
/// the Provision handshake and, if so, its current PolicyKey.
pub struct DeviceRepository {
    pool: SqlitePool,
}

impl DeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DeviceRepository { pool }
    }

    /// Returns the device record, if one exists.
    pub async fn load(&self, user_id: &str, device_id: &str) -> DbResult<Option<DeviceRecord>> {
        let row = sqlx::query!(
            r#"
            SELECT
                user_id,
                device_id,
                device_type,
                is_provisioned as "is_provisioned: bool",
                policy_key
            FROM device_records
            WHERE user_id = ? AND device_id = ?
            "#,
            user_id,
            device_id
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| DeviceRecord {
            user_id: r.user_id,
            device_id: r.device_id,
            device_type: r.device_type,
            is_provisioned: r.is_provisioned,
            policy_key: r.policy_key,
        }))
    }

    /// Returns the existing record, or creates and returns a fresh
    /// unprovisioned one. Idempotent first contact for a (user, device) pair.
    pub async fn load_or_create(
        &self,
        user_id: &str,
        device_id: &str,
        device_type: &str,
    ) -> DbResult<DeviceRecord> {
        if let Some(existing) = self.load(user_id, device_id).await? {
            return Ok(existing);
        }

        let record = DeviceRecord::new_unprovisioned(user_id, device_id, device_type);
        sqlx::query!(
            r#"
            INSERT INTO device_records (user_id, device_id, device_type, is_provisioned, policy_key)
            VALUES (?, ?, ?, 0, ?)
            "#,
            record.user_id,
            record.device_id,
            record.device_type,
            record.policy_key
        )
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Marks a device as provisioned with the given PolicyKey, completing
    /// phase two of the Provision handshake.
    pub async fn mark_provisioned(
        &self,
        user_id: &str,
        device_id: &str,
        policy_key: &str,
    ) -> DbResult<()> {
        let result = sqlx::query!(
            r#"
            UPDATE device_records
            SET is_provisioned = 1, policy_key = ?
            WHERE user_id = ? AND device_id = ?
            "#,
            policy_key,
            user_id,
            device_id
        )
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "DeviceRecord",
                format!("{user_id}/{device_id}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_load_or_create_then_provision() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let devices = db.devices();

        let record = devices
            .load_or_create("alice", "DEVICE1", "iPhone")
            .await
            .unwrap();
        assert!(!record.is_provisioned);
        assert_eq!(record.policy_key, "0");

        devices
            .mark_provisioned("alice", "DEVICE1", "1234567890")
            .await
            .unwrap();

        let record = devices.load("alice", "DEVICE1").await.unwrap().unwrap();
        assert!(record.is_provisioned);
        assert_eq!(record.policy_key, "1234567890");
    }

    #[tokio::test]
    async fn test_load_missing_device_returns_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db.devices().load("alice", "NOPE").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mark_provisioned_missing_device_errors() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .devices()
            .mark_provisioned("alice", "NOPE", "1234567890")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotFound { .. }));
    }
}
